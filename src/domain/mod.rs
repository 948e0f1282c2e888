//! Domain types and the ledger store ports.

pub mod account;
pub mod order;
pub mod ports;
pub mod transfer;
