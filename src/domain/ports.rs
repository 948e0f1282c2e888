use super::account::{Account, AccountId, Amount, Currency};
use super::order::{OrderDraft, OrderId, PaymentOrder};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One open unit of work against the ledger.
///
/// Mutations are only visible to other transactions after `commit`.
/// Dropping a transaction without committing must behave exactly like
/// `rollback`.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Decrements the balance only if the account exists in `currency` and
    /// holds at least `amount`. Returns the number of rows affected.
    async fn conditional_debit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64>;

    /// Increments the balance of the account held in `currency`.
    /// Returns the number of rows affected.
    async fn credit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64>;

    async fn insert_order(&mut self, order: OrderDraft) -> Result<OrderId>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// The transactional store holding accounts and the payment-order log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>>;

    /// Inserts or replaces an account row outside of any transfer.
    async fn put_account(&self, account: Account) -> Result<()>;

    async fn account(&self, id: AccountId) -> Result<Option<Account>>;

    /// All committed accounts, ordered by id.
    async fn accounts(&self) -> Result<Vec<Account>>;

    /// All committed orders, ordered by id.
    async fn orders(&self) -> Result<Vec<PaymentOrder>>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
