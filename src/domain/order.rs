use super::account::{AccountId, Amount, Currency};
use super::transfer::TransferRequest;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub type OrderId = i64;

pub const TRANSFER_PAYMENT_METHOD: &str = "transfer";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// Numeric code stored in the `status` column.
    pub fn code(&self) -> i16 {
        match self {
            OrderStatus::Pending => 1,
            OrderStatus::Processing => 2,
            OrderStatus::Completed => 3,
            OrderStatus::Failed => 4,
            OrderStatus::Cancelled => 5,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(OrderStatus::Pending),
            2 => Some(OrderStatus::Processing),
            3 => Some(OrderStatus::Completed),
            4 => Some(OrderStatus::Failed),
            5 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Order fields as written by a transfer, before the store assigns an id.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderDraft {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_execution_date: DateTime<Utc>,
    /// Partition date: `created_at` truncated to the UTC day.
    pub order_date: NaiveDate,
    pub sender_account_id: AccountId,
    pub beneficiary_account_id: AccountId,
    pub amount: Amount,
    pub status: OrderStatus,
    pub currency: Currency,
    pub reference_number: String,
    pub payment_method: String,
}

impl OrderDraft {
    /// Builds the completed order recorded by a successful transfer.
    pub fn completed_transfer(request: &TransferRequest, now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let scheduled_execution_date = now + Duration::days(rng.gen_range(0..3));
        let reference_number = format!(
            "TX-{}-{}",
            now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros() * 1000),
            rng.gen_range(0..1_000_000)
        );

        Self {
            created_at: now,
            updated_at: now,
            scheduled_execution_date,
            order_date: now.date_naive(),
            sender_account_id: request.sender(),
            beneficiary_account_id: request.beneficiary(),
            amount: request.amount(),
            status: OrderStatus::Completed,
            currency: request.currency().clone(),
            reference_number,
            payment_method: TRANSFER_PAYMENT_METHOD.to_string(),
        }
    }
}

/// A committed payment order. Immutable once written.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentOrder {
    pub id: OrderId,
    #[serde(flatten)]
    pub draft: OrderDraft,
}

impl PaymentOrder {
    pub fn new(id: OrderId, draft: OrderDraft) -> Self {
        Self { id, draft }
    }

    pub fn status(&self) -> OrderStatus {
        self.draft.status
    }

    pub fn amount(&self) -> Amount {
        self.draft.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.draft.currency
    }
}
