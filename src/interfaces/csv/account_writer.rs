use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes account balances as `id,currency,balance` CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts<I>(&mut self, accounts: I) -> Result<()>
    where
        I: IntoIterator<Item = Account>,
    {
        self.writer.write_record(["id", "currency", "balance"])?;
        for account in accounts {
            self.writer.write_record([
                account.id.to_string(),
                account.currency.to_string(),
                account.balance.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
