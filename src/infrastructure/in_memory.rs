use super::row_lock::RowLocks;
use super::staged::{RowBackend, StagedTransaction, allocate_order_id};
use crate::config::StoreConfig;
use crate::domain::account::{Account, AccountId};
use crate::domain::order::{OrderId, PaymentOrder};
use crate::domain::ports::{LedgerStore, LedgerTransaction};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    orders: Vec<PaymentOrder>,
}

/// A thread-safe in-memory ledger.
///
/// Committed state lives behind one `Arc<RwLock<..>>` so that a commit's rows
/// and orders become visible together. Row locks give transfers the same
/// read-committed behaviour a relational store would.
#[derive(Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    locks: Arc<RowLocks>,
    next_order_id: Arc<AtomicI64>,
    config: StoreConfig,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            locks: Arc::new(RowLocks::new()),
            next_order_id: Arc::new(AtomicI64::new(1)),
            config,
        }
    }
}

#[async_trait]
impl RowBackend for InMemoryLedger {
    fn row_locks(&self) -> &RowLocks {
        &self.locks
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn load_account(&self, id: AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    fn next_order_id(&self) -> Result<OrderId> {
        allocate_order_id(&self.next_order_id)
    }

    async fn apply(&self, accounts: Vec<Account>, orders: Vec<PaymentOrder>) -> Result<()> {
        let mut state = self.state.write().await;
        for account in accounts {
            state.accounts.insert(account.id, account);
        }
        state.orders.extend(orders);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        Ok(Box::new(StagedTransaction::new(self.clone())))
    }

    async fn put_account(&self, account: Account) -> Result<()> {
        let _guard = self
            .locks
            .acquire(account.id, self.config.lock_timeout)
            .await?;
        let mut state = self.state.write().await;
        state.accounts.insert(account.id, account);
        Ok(())
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        self.load_account(id).await
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn orders(&self) -> Result<Vec<PaymentOrder>> {
        let state = self.state.read().await;
        let mut orders = state.orders.clone();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}
