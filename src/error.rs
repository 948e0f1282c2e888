use thiserror::Error;

/// Everything that can go wrong while moving money between two accounts.
///
/// Variants fall into three groups: validation errors are raised before the
/// store is touched, business-rule errors abort an open transaction, and
/// transient errors come from the store itself.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("sender and beneficiary are the same: {account}")]
    SameAccount { account: i64 },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("insufficient funds or account not found for sender: {sender}")]
    InsufficientFundsOrAccountNotFound { sender: i64 },
    #[error("account not found for beneficiary: {beneficiary}")]
    BeneficiaryNotFound { beneficiary: i64 },
    #[error("balance of account {account} would overflow")]
    BalanceOverflow { account: i64 },
    #[error("failed to insert payment order")]
    OrderNotInserted,
    #[error("commit conflict: {0}")]
    CommitConflict(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Only optimistic/serialization conflicts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::CommitConflict(_))
    }

    /// True for errors raised before any store interaction.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TransferError::SameAccount { .. }
                | TransferError::InvalidAmount(_)
                | TransferError::InvalidCurrency(_)
                | TransferError::InvalidConfig(_)
        )
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(error: serde_json::Error) -> Self {
        TransferError::StoreUnavailable(format!("row encoding: {}", error))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for TransferError {
    fn from(error: rocksdb::Error) -> Self {
        match error.kind() {
            rocksdb::ErrorKind::Busy
            | rocksdb::ErrorKind::TimedOut
            | rocksdb::ErrorKind::TryAgain => TransferError::CommitConflict(error.to_string()),
            _ => TransferError::StoreUnavailable(error.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
