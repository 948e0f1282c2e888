#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::NamedTempFile;
use transfer_engine::domain::account::{Account, AccountId, Amount, Balance, Currency};
use transfer_engine::domain::order::{OrderDraft, OrderId, PaymentOrder};
use transfer_engine::domain::ports::{LedgerStore, LedgerTransaction};
use transfer_engine::error::{Result, TransferError};
use transfer_engine::infrastructure::in_memory::InMemoryLedger;

pub fn currency(code: &str) -> Currency {
    Currency::new(code).unwrap()
}

pub fn rub() -> Currency {
    currency("RUB")
}

pub async fn seed(store: &dyn LedgerStore, accounts: &[(AccountId, &str, Decimal)]) {
    for (id, code, balance) in accounts {
        store
            .put_account(Account::new(*id, currency(code), *balance).unwrap())
            .await
            .unwrap();
    }
}

pub async fn ledger_with(accounts: &[(AccountId, &str, Decimal)]) -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    seed(&*ledger, accounts).await;
    ledger
}

pub async fn balance(store: &dyn LedgerStore, id: AccountId) -> Balance {
    store.account(id).await.unwrap().unwrap().balance
}

pub async fn total_in(store: &dyn LedgerStore, code: &str) -> Decimal {
    store
        .accounts()
        .await
        .unwrap()
        .iter()
        .filter(|a| a.currency.code() == code)
        .map(|a| a.balance.0)
        .sum()
}

pub fn accounts_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id,currency,balance").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

/// Wraps an in-memory ledger and injects store failures: commits that fail
/// with a serialization conflict, order inserts that affect no row, or a
/// store that refuses to open transactions at all.
pub struct FlakyLedger {
    inner: InMemoryLedger,
    commit_conflicts: Arc<AtomicUsize>,
    failing_inserts: Arc<AtomicBool>,
    unavailable: AtomicBool,
}

impl FlakyLedger {
    pub fn new(inner: InMemoryLedger, commit_conflicts: usize) -> Self {
        Self {
            inner,
            commit_conflicts: Arc::new(AtomicUsize::new(commit_conflicts)),
            failing_inserts: Arc::new(AtomicBool::new(false)),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_failing_inserts(&self, failing: bool) {
        self.failing_inserts.store(failing, Ordering::SeqCst);
    }

    pub fn remaining_conflicts(&self) -> usize {
        self.commit_conflicts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for FlakyLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TransferError::StoreUnavailable("connection refused".to_string()));
        }
        Ok(Box::new(FlakyTransaction {
            inner: self.inner.begin().await?,
            commit_conflicts: Arc::clone(&self.commit_conflicts),
            failing_inserts: Arc::clone(&self.failing_inserts),
        }))
    }

    async fn put_account(&self, account: Account) -> Result<()> {
        self.inner.put_account(account).await
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.account(id).await
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        self.inner.accounts().await
    }

    async fn orders(&self) -> Result<Vec<PaymentOrder>> {
        self.inner.orders().await
    }
}

struct FlakyTransaction {
    inner: Box<dyn LedgerTransaction>,
    commit_conflicts: Arc<AtomicUsize>,
    failing_inserts: Arc<AtomicBool>,
}

#[async_trait]
impl LedgerTransaction for FlakyTransaction {
    async fn conditional_debit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64> {
        self.inner.conditional_debit(account, currency, amount).await
    }

    async fn credit(
        &mut self,
        account: AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<u64> {
        self.inner.credit(account, currency, amount).await
    }

    async fn insert_order(&mut self, order: OrderDraft) -> Result<OrderId> {
        if self.failing_inserts.load(Ordering::SeqCst) {
            return Err(TransferError::OrderNotInserted);
        }
        self.inner.insert_order(order).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let FlakyTransaction {
            inner,
            commit_conflicts,
            ..
        } = *self;
        let conflicted = commit_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            inner.rollback().await?;
            return Err(TransferError::CommitConflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }
        inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}
