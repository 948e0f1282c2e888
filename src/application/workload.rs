use crate::domain::account::{AccountId, Currency};
use crate::domain::transfer::TransferRequest;
use crate::error::{Result, TransferError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::ops::RangeInclusive;

/// The raw parameters of one transfer a worker intends to run.
///
/// Deliberately unvalidated: a plan that names the same account twice is
/// still executed by the worker and recorded as a failed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTransfer {
    pub sender: AccountId,
    pub beneficiary: AccountId,
    pub amount: Decimal,
    pub currency: Currency,
}

impl PlannedTransfer {
    pub fn new(
        sender: AccountId,
        beneficiary: AccountId,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            sender,
            beneficiary,
            amount,
            currency,
        }
    }

    pub fn to_request(&self) -> Result<TransferRequest> {
        TransferRequest::new(
            self.sender,
            self.beneficiary,
            self.amount,
            self.currency.clone(),
        )
    }
}

/// Parameters for generating random transfers.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWorkload {
    pub accounts: RangeInclusive<AccountId>,
    pub currencies: Vec<Currency>,
    /// Largest amount drawn, inclusive. Amounts start at 1.00.
    pub max_amount: Decimal,
    pub seed: u64,
}

impl RandomWorkload {
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            return Err(TransferError::InvalidConfig(format!(
                "empty account range {:?}",
                self.accounts
            )));
        }
        if self.currencies.is_empty() {
            return Err(TransferError::InvalidConfig(
                "at least one currency is required".to_string(),
            ));
        }
        if self.max_amount < Decimal::ONE {
            return Err(TransferError::InvalidConfig(format!(
                "max amount must be at least 1, got {}",
                self.max_amount
            )));
        }
        Ok(())
    }

    /// A reproducible stream of `count` transfers for one worker. Workers get
    /// independent streams derived from the workload seed.
    pub fn stream(&self, worker_id: usize, count: usize) -> RandomTransfers {
        let seed = self.seed.wrapping_add(worker_id as u64);
        // Cents keep the draw exact in decimal; huge maxima are capped.
        let max_cents = self
            .max_amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| i64::try_from(cents.trunc()).ok())
            .unwrap_or(i64::MAX)
            .max(100);
        RandomTransfers {
            rng: StdRng::seed_from_u64(seed),
            accounts: self.accounts.clone(),
            currencies: self.currencies.clone(),
            max_cents,
            remaining: count,
        }
    }
}

/// Iterator over randomly drawn transfers. Sender and beneficiary are drawn
/// independently, so self-transfers occasionally occur.
pub struct RandomTransfers {
    rng: StdRng,
    accounts: RangeInclusive<AccountId>,
    currencies: Vec<Currency>,
    max_cents: i64,
    remaining: usize,
}

impl Iterator for RandomTransfers {
    type Item = PlannedTransfer;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let sender = self.rng.gen_range(self.accounts.clone());
        let beneficiary = self.rng.gen_range(self.accounts.clone());
        let amount = Decimal::new(self.rng.gen_range(100..=self.max_cents), 2);
        let currency = self.currencies.choose(&mut self.rng)?.clone();

        Some(PlannedTransfer::new(sender, beneficiary, amount, currency))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
