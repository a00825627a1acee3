//! Due-date reminders, overdue alerts and the user's notification inbox.

use crate::error::FinanceError;
use crate::models::{NewNotification, Notification, NotificationType, Transaction};
use crate::repositories::{NotificationRepository, TransactionRepository};
use crate::services::metrics::record_notification;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const REMINDER_WINDOW_DAYS: i64 = 3;
const DEDUPE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DueDateSweep {
    pub reminders_sent: u64,
    pub overdue_notifications: u64,
}

pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    transactions: Arc<dyn TransactionRepository>,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            notifications,
            transactions,
        }
    }

    /// Reminds about pending expenses due within the next three days and
    /// flags the ones already past due. At most one notification per type
    /// and transaction is created in any 24 hour window.
    #[instrument(skip(self))]
    pub async fn check_due_dates(&self, now: DateTime<Utc>) -> Result<DueDateSweep, FinanceError> {
        let today = now.date_naive();
        let since = now - Duration::hours(DEDUPE_WINDOW_HOURS);
        let mut sweep = DueDateSweep::default();

        let upcoming = self
            .transactions
            .find_pending_due_between(today, today + Duration::days(REMINDER_WINDOW_DAYS))
            .await?;
        tracing::debug!(count = upcoming.len(), "Transactions due soon");

        for transaction in &upcoming {
            let Some(due_date) = transaction.due_date else {
                continue;
            };
            let notification = NewNotification {
                user_id: transaction.user_id.clone(),
                notification_type: NotificationType::DueDateReminder,
                title: reminder_title((due_date - today).num_days()),
                message: format!(
                    "\"{}\" ({}) is due on {}",
                    transaction.name, transaction.amount, due_date
                ),
                transaction_id: Some(transaction.id),
            };
            if self.notify_once(transaction, notification, since).await? {
                sweep.reminders_sent += 1;
            }
        }

        let overdue = self.transactions.find_pending_due_before(today).await?;
        tracing::debug!(count = overdue.len(), "Overdue transactions");

        for transaction in &overdue {
            let Some(due_date) = transaction.due_date else {
                continue;
            };
            let notification = NewNotification {
                user_id: transaction.user_id.clone(),
                notification_type: NotificationType::Overdue,
                title: "Payment overdue".to_string(),
                message: overdue_message(transaction, (today - due_date).num_days()),
                transaction_id: Some(transaction.id),
            };
            if self.notify_once(transaction, notification, since).await? {
                sweep.overdue_notifications += 1;
            }
        }

        tracing::info!(
            reminders_sent = sweep.reminders_sent,
            overdue_notifications = sweep.overdue_notifications,
            "Due date check completed"
        );

        Ok(sweep)
    }

    async fn notify_once(
        &self,
        transaction: &Transaction,
        notification: NewNotification,
        since: DateTime<Utc>,
    ) -> Result<bool, FinanceError> {
        let already_sent = self
            .notifications
            .exists_since(
                &transaction.user_id,
                notification.notification_type,
                transaction.id,
                since,
            )
            .await?;
        if already_sent {
            return Ok(false);
        }

        self.notifications.create(&notification).await?;
        record_notification(notification.notification_type.as_str());
        Ok(true)
    }

    pub async fn list(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, FinanceError> {
        Ok(self.notifications.list_by_user(user_id, unread_only).await?)
    }

    pub async fn mark_as_read(&self, user_id: &str, id: Uuid) -> Result<(), FinanceError> {
        if !self.notifications.mark_as_read(user_id, id).await? {
            return Err(FinanceError::NotFound("Notification"));
        }
        Ok(())
    }

    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, FinanceError> {
        Ok(self.notifications.mark_all_as_read(user_id).await?)
    }
}

fn reminder_title(days_until_due: i64) -> String {
    match days_until_due {
        i64::MIN..=0 => "Due today".to_string(),
        1 => "Due in 1 day".to_string(),
        n => format!("Due in {} days", n),
    }
}

fn overdue_message(transaction: &Transaction, days_overdue: i64) -> String {
    let unit = if days_overdue == 1 { "day" } else { "days" };
    format!(
        "\"{}\" ({}) is {} {} overdue",
        transaction.name, transaction.amount, days_overdue, unit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        PaymentMethod, PaymentStatus, TransactionCategory, TransactionType,
    };
    use crate::repositories::MemoryStore;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(due: NaiveDate, status: PaymentStatus) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            name: "aluguel".to_string(),
            description: None,
            amount: Decimal::new(120000, 2),
            date: due,
            due_date: Some(due),
            transaction_type: TransactionType::Expense,
            category: TransactionCategory::Housing,
            category_id: None,
            payment_method: PaymentMethod::BankSlip,
            is_recurring: true,
            payment_status: status,
            paid_at: None,
            credit_card_id: None,
            import_job_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn service(store: &Arc<MemoryStore>) -> NotificationService {
        NotificationService::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn sweep_creates_reminders_and_overdue_alerts_once() {
        let store = Arc::new(MemoryStore::new());
        store.add_transaction(expense(date(2026, 3, 10), PaymentStatus::Pending));
        store.add_transaction(expense(date(2026, 3, 13), PaymentStatus::Pending));
        store.add_transaction(expense(date(2026, 3, 14), PaymentStatus::Pending));
        store.add_transaction(expense(date(2026, 3, 8), PaymentStatus::Pending));
        store.add_transaction(expense(date(2026, 3, 11), PaymentStatus::Paid));

        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let sweep = service(&store).check_due_dates(now).await.unwrap();
        assert_eq!(
            sweep,
            DueDateSweep {
                reminders_sent: 2,
                overdue_notifications: 1,
            }
        );

        let again = service(&store).check_due_dates(now).await.unwrap();
        assert_eq!(again, DueDateSweep::default());
        assert_eq!(store.notifications().len(), 3);
    }

    #[tokio::test]
    async fn inbox_operations_are_owner_scoped() {
        let store = Arc::new(MemoryStore::new());
        store.add_transaction(expense(date(2026, 3, 10), PaymentStatus::Pending));
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        service(&store).check_due_dates(now).await.unwrap();

        let inbox = service(&store).list("user_1", true).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "Due today");

        let foreign = service(&store).mark_as_read("user_2", inbox[0].id).await;
        assert!(matches!(foreign, Err(FinanceError::NotFound(_))));

        service(&store).mark_as_read("user_1", inbox[0].id).await.unwrap();
        assert!(service(&store).list("user_1", true).await.unwrap().is_empty());
        assert_eq!(service(&store).mark_all_as_read("user_1").await.unwrap(), 0);
    }

    #[test]
    fn reminder_titles() {
        assert_eq!(reminder_title(0), "Due today");
        assert_eq!(reminder_title(1), "Due in 1 day");
        assert_eq!(reminder_title(3), "Due in 3 days");
    }
}
