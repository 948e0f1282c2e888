use super::account::{AccountId, Amount, Currency};
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;

/// A validated request to move `amount` from `sender` to `beneficiary`.
///
/// Construction rejects self-transfers and non-positive amounts, so an
/// instance never needs re-checking once it reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    sender: AccountId,
    beneficiary: AccountId,
    amount: Amount,
    currency: Currency,
}

impl TransferRequest {
    pub fn new(
        sender: AccountId,
        beneficiary: AccountId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<Self> {
        if sender == beneficiary {
            return Err(TransferError::SameAccount { account: sender });
        }
        let amount = Amount::new(amount)?;
        Ok(Self {
            sender,
            beneficiary,
            amount,
            currency,
        })
    }

    pub fn sender(&self) -> AccountId {
        self.sender
    }

    pub fn beneficiary(&self) -> AccountId {
        self.beneficiary
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }
}
