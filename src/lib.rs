//! Funds-transfer execution engine.
//!
//! Moves money between accounts of a transactional ledger store, recording
//! each movement as a payment order, and drives many such transfers
//! concurrently from independent workers.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
