//! In-process store with the same semantics as the PostgreSQL queries.
//! Backs the test suites and local runs without a database.

use super::{
    CategoryRepository, CreditCardRepository, HealthCheck, ImportJobRepository,
    NotificationRepository, TransactionFilter, TransactionRepository, UserRepository,
};
use crate::models::{
    BillableTransaction, Category, CreditCard, ImportJob, ImportJobStatus, NewNotification,
    NewTransaction, Notification, NotificationType, PaymentStatus, Transaction, TransactionType,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    categories: Vec<Category>,
    cards: HashMap<Uuid, CreditCard>,
    transactions: Vec<Transaction>,
    jobs: HashMap<Uuid, ImportJob>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_job_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_user(&self, user_id: &str) -> User {
        let user = User {
            id: user_id.to_string(),
            email: None,
            name: None,
            created_at: Utc::now(),
        };
        self.state().users.insert(user.id.clone(), user.clone());
        user
    }

    pub fn add_card(&self, card: CreditCard) {
        self.state().cards.insert(card.id, card);
    }

    pub fn add_transaction(&self, transaction: Transaction) {
        self.state().transactions.push(transaction);
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state().transactions.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.state().categories.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    pub fn jobs(&self) -> Vec<ImportJob> {
        self.state().jobs.values().cloned().collect()
    }

    pub fn job(&self, id: Uuid) -> Option<ImportJob> {
        self.state().jobs.get(&id).cloned()
    }

    /// Make every job counter/status write fail, as an unreachable database would.
    pub fn fail_job_updates(&self, fail: bool) {
        self.fail_job_updates.store(fail, Ordering::SeqCst);
    }

    fn check_job_updates(&self) -> Result<(), AppError> {
        if self.fail_job_updates.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "import_jobs is unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.state().users.get(user_id).cloned())
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Category>, AppError> {
        let mut categories: Vec<Category> = self
            .state()
            .categories
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create(&self, user_id: &str, name: &str) -> Result<Category, AppError> {
        let mut state = self.state();
        let duplicate = state
            .categories
            .iter()
            .any(|c| c.user_id == user_id && same_name(&c.name, name));
        if duplicate {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Category '{}' already exists",
                name
            )));
        }

        let category = Category {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn exists_by_name(&self, user_id: &str, name: &str) -> Result<bool, AppError> {
        Ok(self
            .state()
            .categories
            .iter()
            .any(|c| c.user_id == user_id && same_name(&c.name, name)))
    }
}

#[async_trait]
impl CreditCardRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditCard>, AppError> {
        Ok(self.state().cards.get(&id).cloned())
    }

    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<CreditCard>, AppError> {
        let mut cards: Vec<CreditCard> = self
            .state()
            .cards
            .values()
            .filter(|c| c.user_id == user_id && c.is_active)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cards)
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn create(&self, new: &NewTransaction) -> Result<Transaction, AppError> {
        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id: new.user_id.clone(),
            name: new.name.clone(),
            description: new.description.clone(),
            amount: new.amount,
            date: new.date,
            due_date: new.due_date,
            transaction_type: new.transaction_type,
            category: new.category,
            category_id: new.category_id,
            payment_method: new.payment_method,
            is_recurring: new.is_recurring,
            payment_status: PaymentStatus::Pending,
            paid_at: None,
            credit_card_id: new.credit_card_id,
            import_job_id: new.import_job_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.state().transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_by_id(&self, user_id: &str, id: Uuid) -> Result<Option<Transaction>, AppError> {
        Ok(self
            .state()
            .transactions
            .iter()
            .find(|t| t.id == id && t.user_id == user_id && t.deleted_at.is_none())
            .cloned())
    }

    async fn find_billable(
        &self,
        user_id: &str,
        transaction_type: TransactionType,
        filter: &TransactionFilter,
    ) -> Result<Vec<BillableTransaction>, AppError> {
        let state = self.state();
        let mut rows: Vec<BillableTransaction> = state
            .transactions
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.deleted_at.is_none()
                    && t.transaction_type == transaction_type
                    && (t.due_date.is_some()
                        || (transaction_type == TransactionType::Expense
                            && t.credit_card_id.is_some()))
                    && filter.admits(t)
            })
            .map(|t| BillableTransaction {
                transaction: t.clone(),
                card: t
                    .credit_card_id
                    .and_then(|id| state.cards.get(&id))
                    .map(CreditCard::schedule),
            })
            .collect();
        rows.sort_by_key(|r| {
            let t = &r.transaction;
            (t.due_date.is_none(), t.due_date, t.created_at)
        });
        Ok(rows)
    }

    async fn list_by_credit_card(
        &self,
        user_id: &str,
        credit_card_id: Uuid,
    ) -> Result<Vec<Transaction>, AppError> {
        let mut rows: Vec<Transaction> = self
            .state()
            .transactions
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.credit_card_id == Some(credit_card_id)
                    && t.deleted_at.is_none()
            })
            .cloned()
            .collect();
        rows.sort_by_key(|t| (t.date, t.created_at));
        Ok(rows)
    }

    async fn mark_as_paid(
        &self,
        user_id: &str,
        ids: &[Uuid],
        paid_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut updated = 0;
        for t in self.state().transactions.iter_mut() {
            if t.user_id == user_id && ids.contains(&t.id) && t.deleted_at.is_none() {
                t.payment_status = PaymentStatus::Paid;
                t.paid_at = Some(paid_at);
                t.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_as_pending(&self, user_id: &str, ids: &[Uuid]) -> Result<u64, AppError> {
        let mut updated = 0;
        for t in self.state().transactions.iter_mut() {
            if t.user_id == user_id && ids.contains(&t.id) && t.deleted_at.is_none() {
                t.payment_status = PaymentStatus::Pending;
                t.paid_at = None;
                t.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn find_pending_due_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(pending_expenses(&self.state(), |due| due >= start && due <= end))
    }

    async fn find_pending_due_before(&self, date: NaiveDate) -> Result<Vec<Transaction>, AppError> {
        Ok(pending_expenses(&self.state(), |due| due < date))
    }
}

fn pending_expenses<F>(state: &MemoryState, due_matches: F) -> Vec<Transaction>
where
    F: Fn(NaiveDate) -> bool,
{
    let mut rows: Vec<Transaction> = state
        .transactions
        .iter()
        .filter(|t| {
            t.deleted_at.is_none()
                && t.transaction_type == TransactionType::Expense
                && t.payment_status == PaymentStatus::Pending
                && t.due_date.is_some_and(&due_matches)
        })
        .cloned()
        .collect();
    rows.sort_by_key(|t| t.due_date);
    rows
}

#[async_trait]
impl ImportJobRepository for MemoryStore {
    async fn create(
        &self,
        user_id: &str,
        total: i32,
        credit_card_id: Option<Uuid>,
    ) -> Result<ImportJob, AppError> {
        let now = Utc::now();
        let job = ImportJob {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            status: ImportJobStatus::Pending,
            total,
            processed: 0,
            credit_card_id,
            created_at: now,
            updated_at: now,
        };
        self.state().jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImportJob>, AppError> {
        Ok(self.state().jobs.get(&id).cloned())
    }

    async fn increment_processed(&self, id: Uuid) -> Result<ImportJob, AppError> {
        self.check_job_updates()?;
        let mut state = self.state();
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Import job {} not found", id)))?;
        job.processed += 1;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn mark_status(&self, id: Uuid, status: ImportJobStatus) -> Result<bool, AppError> {
        self.check_job_updates()?;
        let mut state = self.state();
        match state.jobs.get_mut(&id) {
            Some(job) if job.status == ImportJobStatus::Pending => {
                job.status = status;
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create(&self, new: &NewNotification) -> Result<Notification, AppError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id.clone(),
            notification_type: new.notification_type,
            title: new.title.clone(),
            message: new.message.clone(),
            is_read: false,
            transaction_id: new.transaction_id,
            created_at: Utc::now(),
        };
        self.state().notifications.push(notification.clone());
        Ok(notification)
    }

    async fn exists_since(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        transaction_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(self.state().notifications.iter().any(|n| {
            n.user_id == user_id
                && n.notification_type == notification_type
                && n.transaction_id == Some(transaction_id)
                && n.created_at >= since
        }))
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError> {
        let mut rows: Vec<Notification> = self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_as_read(&self, user_id: &str, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, AppError> {
        let mut updated = 0;
        for n in self.state().notifications.iter_mut() {
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
