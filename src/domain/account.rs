use crate::error::TransferError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

pub type AccountId = i64;

/// Represents an account balance.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific rules
/// and provide type safety for financial calculations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount for transfers.
///
/// Ensures that transfer amounts are always positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, TransferError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(TransferError::InvalidAmount(format!(
                "amount must be positive, got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = TransferError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// Three-letter uppercase currency code such as `RUB` or `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, TransferError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(TransferError::InvalidCurrency(code.to_string()))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl FromStr for Currency {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-currency account row as held by the ledger store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub currency: Currency,
    pub balance: Balance,
}

impl Account {
    pub fn new(id: AccountId, currency: Currency, balance: Decimal) -> Result<Self, TransferError> {
        let balance = Balance::new(balance);
        if balance.is_negative() {
            return Err(TransferError::InvalidAmount(format!(
                "opening balance of account {} is negative: {}",
                id, balance
            )));
        }
        Ok(Self {
            id,
            currency,
            balance,
        })
    }

    /// Predicate of the conditional debit: same currency and enough funds.
    pub fn can_debit(&self, currency: &Currency, amount: Amount) -> bool {
        self.currency == *currency && self.balance >= amount.into()
    }

    pub fn debit(&mut self, amount: Amount) {
        self.balance -= amount.into();
    }

    pub fn credit(&mut self, amount: Amount) -> Result<(), TransferError> {
        self.balance = self
            .balance
            .checked_add(amount.into())
            .ok_or(TransferError::BalanceOverflow { account: self.id })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rub() -> Currency {
        Currency::new("RUB").unwrap()
    }

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1 + b2, Balance::new(dec!(15.0)));
        assert_eq!(b1 - b2, Balance::new(dec!(5.0)));
        assert!((b2 - b1).is_negative());
        assert!(!Balance::ZERO.is_negative());
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(TransferError::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(TransferError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_currency_validation() {
        assert_eq!(Currency::new("RUB").unwrap().code(), "RUB");
        assert_eq!(Currency::new(" USD ").unwrap().code(), "USD");
        assert!(Currency::new("rub").is_err());
        assert!(Currency::new("RUBL").is_err());
        assert!(Currency::new("").is_err());
    }

    #[test]
    fn test_negative_opening_balance_rejected() {
        assert!(Account::new(1, rub(), dec!(-0.01)).is_err());
        assert!(Account::new(1, rub(), dec!(0)).is_ok());
    }

    #[test]
    fn test_can_debit() {
        let account = Account::new(1, rub(), dec!(100)).unwrap();
        assert!(account.can_debit(&rub(), Amount::new(dec!(100)).unwrap()));
        assert!(!account.can_debit(&rub(), Amount::new(dec!(100.01)).unwrap()));
        assert!(!account.can_debit(
            &Currency::new("USD").unwrap(),
            Amount::new(dec!(1)).unwrap()
        ));
    }

    #[test]
    fn test_debit_and_credit() {
        let mut account = Account::new(1, rub(), dec!(500)).unwrap();
        account.debit(Amount::new(dec!(100)).unwrap());
        assert_eq!(account.balance, Balance::new(dec!(400)));
        account.credit(Amount::new(dec!(0.5)).unwrap()).unwrap();
        assert_eq!(account.balance, Balance::new(dec!(400.5)));
    }

    #[test]
    fn test_credit_overflow_leaves_balance() {
        let mut account = Account::new(2, rub(), Decimal::MAX).unwrap();
        let result = account.credit(Amount::new(dec!(5)).unwrap());
        assert!(matches!(result, Err(TransferError::BalanceOverflow { account: 2 })));
        assert_eq!(account.balance, Balance::new(Decimal::MAX));
    }

    #[test]
    fn test_account_json_shape() {
        let account = Account::new(48, rub(), dec!(20.50)).unwrap();
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, r#"{"id":48,"currency":"RUB","balance":"20.50"}"#);
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
