//! Storage seams. `Database` (PostgreSQL) and `MemoryStore` both implement
//! every trait here.

pub mod memory;

pub use memory::MemoryStore;

use crate::billing::Period;
use crate::models::{
    BillableTransaction, Category, CreditCard, ImportJob, ImportJobStatus, NewNotification,
    NewTransaction, Notification, NotificationType, PaymentStatus, Transaction, TransactionType,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Category>, AppError>;
    async fn create(&self, user_id: &str, name: &str) -> Result<Category, AppError>;
    async fn exists_by_name(&self, user_id: &str, name: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CreditCardRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditCard>, AppError>;
    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<CreditCard>, AppError>;
}

/// Data-access filter for payable/receivable candidates.
///
/// The period applies to the stored due date. Card expenses without a stored
/// due date always pass; their invoice month is only known after resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFilter {
    pub period: Period,
    pub status: Option<PaymentStatus>,
}

impl TransactionFilter {
    pub fn admits(&self, transaction: &Transaction) -> bool {
        let status_ok = self
            .status
            .is_none_or(|status| status == transaction.payment_status);
        let period_ok = transaction
            .due_date
            .is_none_or(|due| self.period.contains(due));
        status_ok && period_ok
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: &NewTransaction) -> Result<Transaction, AppError>;

    async fn find_by_id(&self, user_id: &str, id: Uuid) -> Result<Option<Transaction>, AppError>;

    /// Non-deleted transactions of `transaction_type` that carry a due date,
    /// joined with the card schedule. Expenses on a card qualify without one.
    async fn find_billable(
        &self,
        user_id: &str,
        transaction_type: TransactionType,
        filter: &TransactionFilter,
    ) -> Result<Vec<BillableTransaction>, AppError>;

    async fn list_by_credit_card(
        &self,
        user_id: &str,
        credit_card_id: Uuid,
    ) -> Result<Vec<Transaction>, AppError>;

    async fn mark_as_paid(
        &self,
        user_id: &str,
        ids: &[Uuid],
        paid_at: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    async fn mark_as_pending(&self, user_id: &str, ids: &[Uuid]) -> Result<u64, AppError>;

    /// Pending, non-deleted expenses with `start <= due_date <= end`.
    async fn find_pending_due_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, AppError>;

    /// Pending, non-deleted expenses with `due_date < date`.
    async fn find_pending_due_before(&self, date: NaiveDate) -> Result<Vec<Transaction>, AppError>;
}

#[async_trait]
pub trait ImportJobRepository: Send + Sync {
    async fn create(
        &self,
        user_id: &str,
        total: i32,
        credit_card_id: Option<Uuid>,
    ) -> Result<ImportJob, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImportJob>, AppError>;

    /// Atomic `processed + 1` at the storage layer; returns the updated job.
    async fn increment_processed(&self, id: Uuid) -> Result<ImportJob, AppError>;

    /// Move a PENDING job to `status`. Returns false when the job was
    /// missing or already terminal.
    async fn mark_status(&self, id: Uuid, status: ImportJobStatus) -> Result<bool, AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<Notification, AppError>;

    async fn exists_since(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        transaction_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    async fn list_by_user(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError>;

    async fn mark_as_read(&self, user_id: &str, id: Uuid) -> Result<bool, AppError>;

    async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, AppError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;
}

/// One store behind every repository seam.
pub trait Store:
    UserRepository
    + CategoryRepository
    + CreditCardRepository
    + TransactionRepository
    + ImportJobRepository
    + NotificationRepository
    + HealthCheck
    + 'static
{
}

impl<T> Store for T where
    T: UserRepository
        + CategoryRepository
        + CreditCardRepository
        + TransactionRepository
        + ImportJobRepository
        + NotificationRepository
        + HealthCheck
        + 'static
{
}

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub cards: Arc<dyn CreditCardRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub import_jobs: Arc<dyn ImportJobRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    pub fn from_store<S: Store>(store: Arc<S>) -> Self {
        Self {
            users: store.clone(),
            categories: store.clone(),
            cards: store.clone(),
            transactions: store.clone(),
            import_jobs: store.clone(),
            notifications: store.clone(),
            health: store,
        }
    }
}
