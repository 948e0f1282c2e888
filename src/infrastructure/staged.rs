use super::row_lock::{RowGuard, RowLocks};
use crate::config::StoreConfig;
use crate::domain::account::{Account, AccountId, Amount, Currency};
use crate::domain::order::{OrderDraft, OrderId, PaymentOrder};
use crate::domain::ports::LedgerTransaction;
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Storage primitives a backend provides so that `StagedTransaction` can run
/// transfers on top of it.
#[async_trait]
pub(crate) trait RowBackend: Clone + Send + Sync + 'static {
    fn row_locks(&self) -> &RowLocks;

    fn config(&self) -> &StoreConfig;

    /// Reads the latest committed version of an account row.
    async fn load_account(&self, id: AccountId) -> Result<Option<Account>>;

    fn next_order_id(&self) -> Result<OrderId>;

    /// Makes all rows and orders durable in one atomic step.
    async fn apply(&self, accounts: Vec<Account>, orders: Vec<PaymentOrder>) -> Result<()>;
}

/// Hands out the next id of an order sequence. An exhausted sequence means
/// the order row cannot be inserted.
pub(crate) fn allocate_order_id(sequence: &AtomicI64) -> Result<OrderId> {
    sequence
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
        .map_err(|_| TransferError::OrderNotInserted)
}

/// A transaction that locks the rows it touches and buffers every write
/// until commit. Dropping it discards the buffer and releases the locks.
pub(crate) struct StagedTransaction<B: RowBackend> {
    backend: B,
    held: HashMap<AccountId, RowGuard>,
    rows: HashMap<AccountId, Option<Account>>,
    dirty: BTreeSet<AccountId>,
    orders: Vec<PaymentOrder>,
}

impl<B: RowBackend> StagedTransaction<B> {
    pub(crate) fn new(backend: B) -> Self {
        Self {
            backend,
            held: HashMap::new(),
            rows: HashMap::new(),
            dirty: BTreeSet::new(),
            orders: Vec::new(),
        }
    }

    /// Locks the row on first touch, then serves it from the transaction's
    /// own view so later steps see earlier staged writes.
    async fn locked_row(&mut self, id: AccountId) -> Result<Option<&mut Account>> {
        if !self.rows.contains_key(&id) {
            let timeout = self.backend.config().lock_timeout;
            let guard = self.backend.row_locks().acquire(id, timeout).await?;
            self.held.insert(id, guard);
            let row = self.backend.load_account(id).await?;
            self.rows.insert(id, row);
        }
        Ok(self.rows.get_mut(&id).and_then(Option::as_mut))
    }
}

#[async_trait]
impl<B: RowBackend> LedgerTransaction for StagedTransaction<B> {
    async fn conditional_debit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64> {
        let Some(row) = self.locked_row(account).await? else {
            return Ok(0);
        };
        if !row.can_debit(currency, amount) {
            return Ok(0);
        }
        row.debit(amount);
        self.dirty.insert(account);
        Ok(1)
    }

    async fn credit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64> {
        let Some(row) = self.locked_row(account).await? else {
            return Ok(0);
        };
        if row.currency != *currency {
            return Ok(0);
        }
        row.credit(amount)?;
        self.dirty.insert(account);
        Ok(1)
    }

    async fn insert_order(&mut self, order: OrderDraft) -> Result<OrderId> {
        let id = self.backend.next_order_id()?;
        self.orders.push(PaymentOrder::new(id, order));
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let StagedTransaction {
            backend,
            held,
            rows,
            dirty,
            orders,
        } = *self;

        let accounts: Vec<Account> = dirty
            .into_iter()
            .filter_map(|id| rows.get(&id).cloned().flatten())
            .collect();
        debug!(
            "committing {} account row(s) and {} order(s)",
            accounts.len(),
            orders.len()
        );

        let result = backend.apply(accounts, orders).await;
        // Locks are released only after the writes are visible.
        drop(held);
        result
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        debug!(
            "rolling back {} staged row(s) and {} order(s)",
            self.dirty.len(),
            self.orders.len()
        );
        Ok(())
    }
}
