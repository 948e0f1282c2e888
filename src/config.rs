use std::time::Duration;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Tuning knobs shared by every ledger store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long a transaction waits for an account row lock before giving up
    /// with a commit conflict. Also breaks deadlocks between opposite transfers.
    pub lock_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl StoreConfig {
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self { lock_timeout }
    }
}
