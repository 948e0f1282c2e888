//! Application layer containing the transfer orchestration.
//!
//! `TransferExecutor` performs single atomic transfers inside a
//! `UnitOfWork`; `TransferDriver` fans them out over concurrent tokio
//! workers and collects each operation's outcome.

pub mod driver;
pub mod executor;
pub mod retry;
pub mod unit_of_work;
pub mod workload;
