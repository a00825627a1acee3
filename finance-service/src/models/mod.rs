//! Domain models for finance-service.

mod enums;
mod message;

pub use enums::{
    EffectiveStatus, ImportJobStatus, NotificationType, PaymentMethod, PaymentStatus,
    SettlementMode, SettlementScope, TransactionCategory, TransactionType,
};
pub use message::{ParsedTransaction, TransactionMessage, parse_calendar_date};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Users and Categories
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User-defined category; names are unique per user ignoring case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Credit Cards
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreditCard {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub last_four_digits: Option<String>,
    pub brand: Option<String>,
    pub due_day: Option<u32>,
    pub closing_day: Option<u32>,
    pub limit: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditCard {
    pub fn schedule(&self) -> CardSchedule {
        CardSchedule {
            name: Some(self.name.clone()),
            due_day: self.due_day,
            closing_day: self.closing_day,
        }
    }
}

/// The slice of a card needed to place its transactions into invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardSchedule {
    pub name: Option<String>,
    pub due_day: Option<u32>,
    pub closing_day: Option<u32>,
}

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub category_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub is_recurring: bool,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub credit_card_id: Option<Uuid>,
    pub import_job_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fully validated input for a transaction insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub category_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub is_recurring: bool,
    pub credit_card_id: Option<Uuid>,
    pub import_job_id: Option<Uuid>,
}

/// A transaction together with the schedule of its card, if any.
#[derive(Debug, Clone)]
pub struct BillableTransaction {
    pub transaction: Transaction,
    pub card: Option<CardSchedule>,
}

// ============================================================================
// Import Jobs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub user_id: String,
    pub status: ImportJobStatus,
    pub total: i32,
    pub processed: i32,
    pub credit_card_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn is_fully_processed(&self) -> bool {
        self.processed >= self.total
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub transaction_id: Option<Uuid>,
}
