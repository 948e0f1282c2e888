use super::retry::RetryPolicy;
use super::unit_of_work::UnitOfWork;
use crate::domain::order::{OrderDraft, OrderId};
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transfer::TransferRequest;
use crate::error::{Result, TransferError};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Executes single funds transfers against a ledger store.
///
/// Every transfer runs in its own unit of work: debit the sender, credit the
/// beneficiary, append one completed payment order, commit. Any failure rolls
/// the whole unit back. The executor never retries on its own.
#[derive(Clone)]
pub struct TransferExecutor {
    store: LedgerStoreRef,
}

impl TransferExecutor {
    /// Creates a new `TransferExecutor` bound to `store`.
    pub fn new(store: LedgerStoreRef) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LedgerStoreRef {
        &self.store
    }

    /// Performs one atomic transfer and returns the id of the recorded order.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<OrderId> {
        let sender = request.sender();
        let beneficiary = request.beneficiary();
        let currency = request.currency();
        let amount = request.amount();

        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;

        if uow.conditional_debit(sender, currency, amount).await? == 0 {
            return Err(TransferError::InsufficientFundsOrAccountNotFound { sender });
        }

        if uow.credit(beneficiary, currency, amount).await? == 0 {
            return Err(TransferError::BeneficiaryNotFound { beneficiary });
        }

        let order_id = uow
            .insert_order(OrderDraft::completed_transfer(request, Utc::now()))
            .await?;

        uow.commit().await?;
        debug!(
            "transfer {} -> {} of {} {} committed as order {}",
            sender, beneficiary, amount, currency, order_id
        );
        Ok(order_id)
    }

    /// Runs [`transfer`](Self::transfer) under a caller-supplied retry policy.
    /// Returns the outcome and the number of attempts made.
    pub async fn transfer_with_retry(
        &self,
        request: &TransferRequest,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> (Result<OrderId>, u32) {
        policy.run(cancel, move || self.transfer(request)).await
    }
}
