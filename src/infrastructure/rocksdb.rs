use super::row_lock::RowLocks;
use super::staged::{RowBackend, StagedTransaction, allocate_order_id};
use crate::config::StoreConfig;
use crate::domain::account::{Account, AccountId};
use crate::domain::order::{OrderId, PaymentOrder};
use crate::domain::ports::{LedgerStore, LedgerTransaction};
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use tracing::info;

/// Column Family for storing account rows.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for the append-only payment-order log.
pub const CF_ORDERS: &str = "orders";

/// A persistent ledger implementation using RocksDB.
///
/// Accounts and orders live in separate Column Families keyed by their
/// big-endian id. A commit is a single `WriteBatch`, so both legs of a
/// transfer and its order become durable together or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<DB>,
    locks: Arc<RowLocks>,
    next_order_id: Arc<AtomicI64>,
    config: StoreConfig,
}

impl RocksDbLedger {
    /// Opens or creates a RocksDB ledger at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Opens the ledger and resumes the order sequence after the highest
    /// persisted order id.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_orders])?;

        let last_order_id = {
            let cf = column_family(&db, CF_ORDERS)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    decode_key(&key)?
                }
                None => 0,
            }
        };
        info!("Opened RocksDB ledger, last order id {}", last_order_id);

        Ok(Self {
            db: Arc::new(db),
            locks: Arc::new(RowLocks::new()),
            next_order_id: Arc::new(AtomicI64::new(last_order_id + 1)),
            config,
        })
    }

    fn scan<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let cf = column_family(&self.db, name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| TransferError::StoreUnavailable(format!("{} column family not found", name)))
}

fn decode_key(key: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| {
            TransferError::StoreUnavailable(format!("malformed key of {} bytes", key.len()))
        })?;
    Ok(i64::from_be_bytes(bytes))
}

#[async_trait]
impl RowBackend for RocksDbLedger {
    fn row_locks(&self) -> &RowLocks {
        &self.locks
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn load_account(&self, id: AccountId) -> Result<Option<Account>> {
        let cf = column_family(&self.db, CF_ACCOUNTS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn next_order_id(&self) -> Result<OrderId> {
        allocate_order_id(&self.next_order_id)
    }

    async fn apply(&self, accounts: Vec<Account>, orders: Vec<PaymentOrder>) -> Result<()> {
        let cf_accounts = column_family(&self.db, CF_ACCOUNTS)?;
        let cf_orders = column_family(&self.db, CF_ORDERS)?;

        let mut batch = WriteBatch::default();
        for account in &accounts {
            batch.put_cf(cf_accounts, account.id.to_be_bytes(), serde_json::to_vec(account)?);
        }
        for order in &orders {
            batch.put_cf(cf_orders, order.id.to_be_bytes(), serde_json::to_vec(order)?);
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for RocksDbLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        Ok(Box::new(StagedTransaction::new(self.clone())))
    }

    async fn put_account(&self, account: Account) -> Result<()> {
        let _guard = self
            .locks
            .acquire(account.id, self.config.lock_timeout)
            .await?;
        let cf = column_family(&self.db, CF_ACCOUNTS)?;
        self.db
            .put_cf(cf, account.id.to_be_bytes(), serde_json::to_vec(&account)?)?;
        Ok(())
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        self.load_account(id).await
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.scan(CF_ACCOUNTS)?;
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn orders(&self) -> Result<Vec<PaymentOrder>> {
        let mut orders: Vec<PaymentOrder> = self.scan(CF_ORDERS)?;
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}
