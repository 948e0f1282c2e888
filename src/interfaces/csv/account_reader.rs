use crate::domain::account::{Account, AccountId, Currency};
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct AccountRow {
    id: AccountId,
    currency: String,
    balance: Decimal,
}

impl TryFrom<AccountRow> for Account {
    type Error = TransferError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Account::new(row.id, Currency::new(&row.currency)?, row.balance)
    }
}

/// Reads accounts from a CSV source with an `id,currency,balance` header.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Account>`.
/// It handles whitespace trimming automatically.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    /// Creates a new `AccountReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates accounts.
    pub fn accounts(self) -> impl Iterator<Item = Result<Account>> {
        self.reader
            .into_deserialize::<AccountRow>()
            .map(|result| result.map_err(TransferError::from).and_then(Account::try_from))
    }
}
