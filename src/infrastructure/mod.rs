//! Ledger store backends.
//!
//! Both backends share the same transaction machinery: exclusive row locks
//! taken on first touch, writes staged in the transaction, and an atomic
//! apply on commit.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod row_lock;
mod staged;
