use crate::domain::account::{AccountId, Amount, Currency};
use crate::domain::order::{OrderDraft, OrderId};
use crate::domain::ports::{LedgerStore, LedgerTransaction};
use crate::error::{Result, TransferError};
use tracing::debug;

/// Scoped ownership of one ledger transaction.
///
/// Rollback is the default outcome: unless `commit` is called, the
/// transaction is rolled back when the unit of work goes out of scope,
/// including on early returns through `?`. The underlying transaction is
/// released exactly once.
pub struct UnitOfWork {
    tx: Option<Box<dyn LedgerTransaction>>,
}

impl UnitOfWork {
    pub async fn begin(store: &dyn LedgerStore) -> Result<Self> {
        let tx = store.begin().await?;
        Ok(Self { tx: Some(tx) })
    }

    fn tx(&mut self) -> Result<&mut Box<dyn LedgerTransaction>> {
        self.tx
            .as_mut()
            .ok_or_else(|| TransferError::Internal("unit of work already released".to_string()))
    }

    pub async fn conditional_debit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64> {
        self.tx()?.conditional_debit(account, currency, amount).await
    }

    pub async fn credit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64> {
        self.tx()?.credit(account, currency, amount).await
    }

    pub async fn insert_order(&mut self, order: OrderDraft) -> Result<OrderId> {
        self.tx()?.insert_order(order).await
    }

    pub async fn commit(mut self) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            TransferError::Internal("unit of work already released".to_string())
        })?;
        tx.commit().await
    }

    pub async fn rollback(mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!("unit of work dropped without commit, rolling back");
            drop(tx);
        }
    }
}
