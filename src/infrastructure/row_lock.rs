use crate::domain::account::AccountId;
use crate::error::{Result, TransferError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<AccountId, Arc<Mutex<()>>>;

/// Exclusive per-account row locks.
///
/// A transaction takes the lock on first touch of a row and keeps the guard
/// until it commits or rolls back. Waiting is bounded by a timeout, which is
/// also how two transfers locking the same pair in opposite order get out of
/// each other's way.
///
/// Entries live only while some transaction holds or waits for them.
#[derive(Default)]
pub struct RowLocks {
    rows: Arc<LockTable>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, account: AccountId, timeout: Duration) -> Result<RowGuard> {
        // Clone the mutex out so the shard lock is not held across the await.
        let row = self.rows.entry(account).or_default().clone();
        let locked = tokio::time::timeout(timeout, row.lock_owned()).await;
        match locked {
            Ok(guard) => Ok(RowGuard {
                guard: Some(guard),
                account,
                rows: Arc::clone(&self.rows),
            }),
            Err(_) => {
                release_if_idle(&self.rows, account);
                Err(TransferError::CommitConflict(format!(
                    "lock timeout after {:?} on account {}",
                    timeout, account
                )))
            }
        }
    }

    /// Number of rows currently locked or awaited.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Holds one account row until dropped.
pub struct RowGuard {
    guard: Option<OwnedMutexGuard<()>>,
    account: AccountId,
    rows: Arc<LockTable>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        // The guard owns a handle to the mutex; release it before the count check.
        self.guard.take();
        release_if_idle(&self.rows, self.account);
    }
}

/// Removes the entry when the table holds the only handle. Runs under the
/// shard lock, so it cannot race with an `acquire` cloning the same entry.
fn release_if_idle(rows: &LockTable, account: AccountId) {
    rows.remove_if(&account, |_, row| Arc::strong_count(row) == 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let locks = RowLocks::new();
        let guard = locks.acquire(1, Duration::from_millis(50)).await.unwrap();

        let second = locks.acquire(1, Duration::from_millis(20)).await;
        assert!(matches!(second, Err(TransferError::CommitConflict(_))));

        drop(guard);
        assert!(locks.acquire(1, Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_rows_lock_independently() {
        let locks = RowLocks::new();
        let _a = locks.acquire(1, Duration::from_millis(20)).await.unwrap();
        assert!(locks.acquire(2, Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_released_rows_leave_the_table() {
        let locks = RowLocks::new();
        for id in 0..100 {
            let _guard = locks.acquire(id, Duration::from_millis(20)).await.unwrap();
        }
        assert!(locks.is_empty());

        let held = locks.acquire(7, Duration::from_millis(20)).await.unwrap();
        assert!(locks.acquire(7, Duration::from_millis(10)).await.is_err());
        assert_eq!(locks.len(), 1);
        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_awaited() {
        let locks = Arc::new(RowLocks::new());
        let held = locks.acquire(1, Duration::from_millis(50)).await.unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                locks.acquire(1, Duration::from_secs(2)).await.map(|_| ())
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(held);

        waiter.await.unwrap().unwrap();
        assert!(locks.is_empty());
    }
}
