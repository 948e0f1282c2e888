use super::executor::TransferExecutor;
use super::retry::RetryPolicy;
use super::workload::{PlannedTransfer, RandomWorkload};
use crate::domain::order::OrderId;
use crate::error::{Result, TransferError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_PROGRESS_EVERY: usize = 1000;

/// Configuration of a randomized driver run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub workers: usize,
    pub ops_per_worker: usize,
    pub workload: RandomWorkload,
}

impl DriverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TransferError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        self.workload.validate()
    }
}

/// Tagged result of one operation. Failures are data, not control flow.
#[derive(Debug)]
pub enum TransferOutcome {
    Completed { order_id: OrderId },
    Failed { error: TransferError },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }
}

#[derive(Debug)]
pub struct OperationRecord {
    pub op: usize,
    pub planned: PlannedTransfer,
    pub attempts: u32,
    pub outcome: TransferOutcome,
}

#[derive(Debug)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub operations: Vec<OperationRecord>,
    /// Set when the worker stopped early because the run was cancelled.
    pub cancelled: bool,
}

impl WorkerReport {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            operations: Vec::new(),
            cancelled: false,
        }
    }

    pub fn completed(&self) -> usize {
        self.operations
            .iter()
            .filter(|r| r.outcome.is_completed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.operations.len() - self.completed()
    }
}

/// Aggregate of every worker's outcomes.
#[derive(Debug)]
pub struct DriverReport {
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
}

impl DriverReport {
    pub fn total(&self) -> usize {
        self.workers.iter().map(|w| w.operations.len()).sum()
    }

    pub fn completed(&self) -> usize {
        self.workers.iter().map(WorkerReport::completed).sum()
    }

    pub fn failed(&self) -> usize {
        self.workers.iter().map(WorkerReport::failed).sum()
    }

    pub fn cancelled_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.cancelled).count()
    }

    pub fn order_ids(&self) -> Vec<OrderId> {
        self.workers
            .iter()
            .flat_map(|w| &w.operations)
            .filter_map(|r| match r.outcome {
                TransferOutcome::Completed { order_id } => Some(order_id),
                TransferOutcome::Failed { .. } => None,
            })
            .collect()
    }
}

/// Fans transfers out over independent workers.
///
/// Each worker runs its operations strictly in sequence on its own tokio
/// task; workers share nothing but the executor's store handle. A failed
/// transfer is logged and recorded, and the worker moves on.
pub struct TransferDriver {
    executor: Arc<TransferExecutor>,
    retry: RetryPolicy,
    progress_every: usize,
}

impl TransferDriver {
    pub fn new(executor: Arc<TransferExecutor>, retry: RetryPolicy) -> Self {
        Self {
            executor,
            retry,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }

    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    /// Runs `workers` x `ops_per_worker` random transfers and waits until every
    /// worker has finished or stopped on cancellation.
    pub async fn run_workers(
        &self,
        config: &DriverConfig,
        cancel: CancellationToken,
    ) -> Result<DriverReport> {
        config.validate()?;
        info!(
            "Starting {} workers, {} ops each...",
            config.workers, config.ops_per_worker
        );

        let streams = (1..=config.workers)
            .map(|id| config.workload.stream(id, config.ops_per_worker))
            .collect();
        Ok(self.run_streams(streams, cancel).await)
    }

    /// Runs one worker per plan, each executing its plan in order.
    pub async fn run_plans(
        &self,
        plans: Vec<Vec<PlannedTransfer>>,
        cancel: CancellationToken,
    ) -> DriverReport {
        info!("Starting {} workers with fixed plans...", plans.len());
        let streams = plans.into_iter().map(Vec::into_iter).collect();
        self.run_streams(streams, cancel).await
    }

    async fn run_streams<I>(&self, streams: Vec<I>, cancel: CancellationToken) -> DriverReport
    where
        I: Iterator<Item = PlannedTransfer> + Send + 'static,
    {
        let started = Instant::now();

        let handles: Vec<(usize, JoinHandle<WorkerReport>)> = streams
            .into_iter()
            .enumerate()
            .map(|(index, ops)| {
                let worker = Worker {
                    id: index + 1,
                    executor: Arc::clone(&self.executor),
                    retry: self.retry,
                    progress_every: self.progress_every,
                    cancel: cancel.clone(),
                };
                (worker.id, tokio::spawn(worker.run(ops)))
            })
            .collect();

        let mut workers = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(report) => workers.push(report),
                Err(e) => error!("worker {} did not finish: {}", id, e),
            }
        }

        let report = DriverReport {
            workers,
            elapsed: started.elapsed(),
        };
        info!(
            "All {} workers finished: {} completed, {} failed in {:?}",
            report.workers.len(),
            report.completed(),
            report.failed(),
            report.elapsed
        );
        report
    }
}

struct Worker {
    id: usize,
    executor: Arc<TransferExecutor>,
    retry: RetryPolicy,
    progress_every: usize,
    cancel: CancellationToken,
}

impl Worker {
    async fn run<I>(self, ops: I) -> WorkerReport
    where
        I: Iterator<Item = PlannedTransfer>,
    {
        let mut report = WorkerReport::new(self.id);

        for (op, planned) in ops.enumerate() {
            // Checked only between operations: an in-flight transfer always
            // reaches its own commit or rollback.
            if self.cancel.is_cancelled() {
                info!("worker {} cancelled after {} operations", self.id, op);
                report.cancelled = true;
                break;
            }

            let record = self.execute(op, planned).await;
            if let TransferOutcome::Failed { error } = &record.outcome {
                warn!("worker {}, op {} error: {}", self.id, op, error);
            }
            report.operations.push(record);

            if (op + 1) % self.progress_every == 0 {
                info!("worker {} finished {} operations", self.id, op + 1);
            }
        }

        if !report.cancelled {
            info!(
                "worker {} finished all {} operations",
                self.id,
                report.operations.len()
            );
        }
        report
    }

    async fn execute(&self, op: usize, planned: PlannedTransfer) -> OperationRecord {
        let (result, attempts) = match planned.to_request() {
            Ok(request) => {
                self.executor
                    .transfer_with_retry(&request, &self.retry, &self.cancel)
                    .await
            }
            Err(e) => (Err(e), 0),
        };

        let outcome = match result {
            Ok(order_id) => TransferOutcome::Completed { order_id },
            Err(error) => TransferOutcome::Failed { error },
        };
        OperationRecord {
            op,
            planned,
            attempts,
            outcome,
        }
    }
}
