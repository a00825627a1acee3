use super::Stage;
use crate::billing::resolve_due_date;
use crate::error::FinanceError;
use crate::models::{ImportJobStatus, NewTransaction, TransactionMessage};
use crate::repositories::{
    CreditCardRepository, ImportJobRepository, TransactionRepository, UserRepository,
};
use crate::services::metrics::{record_import_job, record_job_counter_failure};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

/// Validates the accumulated message, writes the transaction and advances
/// the originating import job.
pub struct PersistStage {
    users: Arc<dyn UserRepository>,
    cards: Arc<dyn CreditCardRepository>,
    transactions: Arc<dyn TransactionRepository>,
    import_jobs: Arc<dyn ImportJobRepository>,
}

impl PersistStage {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cards: Arc<dyn CreditCardRepository>,
        transactions: Arc<dyn TransactionRepository>,
        import_jobs: Arc<dyn ImportJobRepository>,
    ) -> Self {
        Self {
            users,
            cards,
            transactions,
            import_jobs,
        }
    }

    /// Only the owner's card with a configured due day yields a due date.
    async fn card_due_date(
        &self,
        user_id: &str,
        credit_card_id: Option<Uuid>,
        date: NaiveDate,
    ) -> Result<Option<NaiveDate>, FinanceError> {
        let Some(card_id) = credit_card_id else {
            return Ok(None);
        };

        let due_date = match self.cards.find_by_id(card_id).await? {
            Some(card) if card.user_id == user_id => {
                resolve_due_date(None, date, Some(&card.schedule()))
            }
            Some(_) => {
                tracing::warn!(credit_card_id = %card_id, "Credit card belongs to another user, ignoring for due date");
                None
            }
            None => None,
        };
        Ok(due_date)
    }

    /// Counter failures are logged and swallowed: the transaction is
    /// already written and must not be reported as failed.
    async fn advance_job(&self, job_id: Uuid) {
        let job = match self.import_jobs.increment_processed(job_id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to increment import job counter");
                record_job_counter_failure("increment");
                return;
            }
        };

        tracing::debug!(job_id = %job_id, processed = job.processed, total = job.total, "Import job progress");

        if !job.is_fully_processed() {
            return;
        }

        match self
            .import_jobs
            .mark_status(job_id, ImportJobStatus::Completed)
            .await
        {
            Ok(true) => {
                tracing::info!(job_id = %job_id, total = job.total, "Import job completed");
                record_import_job(ImportJobStatus::Completed.as_str());
            }
            Ok(false) => {
                tracing::debug!(job_id = %job_id, "Import job already terminal");
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to mark import job completed");
                record_job_counter_failure("complete");
            }
        }
    }
}

#[async_trait]
impl Stage for PersistStage {
    fn name(&self) -> &'static str {
        "persist"
    }

    async fn apply(&self, message: TransactionMessage) -> Result<TransactionMessage, FinanceError> {
        tracing::debug!(message = ?message, "Persisting transaction");

        let user_id = message.user_id.trim().to_string();
        let name = message.name.clone().filter(|n| !n.trim().is_empty());

        let (Some(name), Some(amount), Some(date)) = (name, message.amount, message.date) else {
            let mut missing = Vec::new();
            if user_id.is_empty() {
                missing.push("userId");
            }
            if message.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
                missing.push("name");
            }
            if message.amount.is_none() {
                missing.push("amount");
            }
            if message.date.is_none() {
                missing.push("date");
            }
            return Err(FinanceError::IncompleteTransaction(missing));
        };
        if user_id.is_empty() {
            return Err(FinanceError::IncompleteTransaction(vec!["userId"]));
        }

        if self.users.find_by_id(&user_id).await?.is_none() {
            return Err(FinanceError::UserNotFound(user_id));
        }

        let (Some(transaction_type), Some(category), Some(payment_method)) = (
            message.transaction_type,
            message.category,
            message.payment_method,
        ) else {
            let missing = [
                ("type", message.transaction_type.is_none()),
                ("category", message.category.is_none()),
                ("paymentMethod", message.payment_method.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();
            return Err(FinanceError::IncompleteClassification(missing));
        };

        let due_date = self
            .card_due_date(&user_id, message.credit_card_id, date)
            .await?;

        let transaction = self
            .transactions
            .create(&NewTransaction {
                user_id: user_id.clone(),
                name,
                description: message.description.clone(),
                amount,
                date,
                due_date,
                transaction_type,
                category,
                category_id: message.category_id,
                payment_method,
                is_recurring: message.is_recurring.unwrap_or(false),
                credit_card_id: message.credit_card_id,
                import_job_id: message.import_job_id,
            })
            .await?;

        tracing::info!(
            transaction_id = %transaction.id,
            user_id = %user_id,
            due_date = ?transaction.due_date,
            "Transaction persisted"
        );

        if let Some(job_id) = message.import_job_id {
            self.advance_job(job_id).await;
        }

        Ok(TransactionMessage { user_id, ..message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreditCard, PaymentMethod, TransactionCategory, TransactionType};
    use crate::repositories::MemoryStore;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn stage(store: &Arc<MemoryStore>) -> PersistStage {
        PersistStage::new(store.clone(), store.clone(), store.clone(), store.clone())
    }

    fn classified(user_id: &str) -> TransactionMessage {
        TransactionMessage {
            user_id: user_id.to_string(),
            name: Some("padaria".to_string()),
            amount: Some(Decimal::new(500, 2)),
            date: NaiveDate::from_ymd_opt(2026, 2, 6),
            transaction_type: Some(TransactionType::Expense),
            category: Some(TransactionCategory::Food),
            payment_method: Some(PaymentMethod::CreditCard),
            ..Default::default()
        }
    }

    fn card(user_id: &str, due_day: Option<u32>) -> CreditCard {
        CreditCard {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: "Visa".to_string(),
            last_four_digits: None,
            brand: None,
            due_day,
            closing_day: Some(5),
            limit: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reports_missing_required_fields() {
        let store = Arc::new(MemoryStore::new());
        let message = TransactionMessage {
            user_id: "user_1".to_string(),
            name: Some("   ".to_string()),
            ..Default::default()
        };

        match stage(&store).apply(message).await {
            Err(FinanceError::IncompleteTransaction(missing)) => {
                assert_eq!(missing, vec!["name", "amount", "date"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn trims_user_id_and_requires_existing_user() {
        let store = Arc::new(MemoryStore::new());
        let result = stage(&store).apply(classified("ghost")).await;
        assert!(matches!(result, Err(FinanceError::UserNotFound(id)) if id == "ghost"));

        store.add_user("user_1");
        let out = stage(&store).apply(classified("  user_1 ")).await.unwrap();
        assert_eq!(out.user_id, "user_1");
        assert_eq!(store.transactions()[0].user_id, "user_1");
    }

    #[tokio::test]
    async fn requires_complete_classification() {
        let store = Arc::new(MemoryStore::new());
        store.add_user("user_1");
        let message = TransactionMessage {
            payment_method: None,
            ..classified("user_1")
        };

        match stage(&store).apply(message).await {
            Err(FinanceError::IncompleteClassification(missing)) => {
                assert_eq!(missing, vec!["paymentMethod"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn computes_due_date_from_owned_card() {
        let store = Arc::new(MemoryStore::new());
        store.add_user("user_1");
        let owned = card("user_1", Some(10));
        let foreign = card("user_2", Some(10));
        let no_due_day = card("user_1", None);
        for c in [&owned, &foreign, &no_due_day] {
            store.add_card(c.clone());
        }

        for c in [&owned, &foreign, &no_due_day] {
            let message = TransactionMessage {
                credit_card_id: Some(c.id),
                ..classified("user_1")
            };
            stage(&store).apply(message).await.unwrap();
        }

        let due_dates: Vec<_> = store.transactions().iter().map(|t| t.due_date).collect();
        assert_eq!(due_dates, vec![NaiveDate::from_ymd_opt(2026, 3, 10), None, None]);
    }

    #[tokio::test]
    async fn completes_job_after_last_row() {
        let store = Arc::new(MemoryStore::new());
        store.add_user("user_1");
        let job = ImportJobRepository::create(store.as_ref(), "user_1", 3, None)
            .await
            .unwrap();

        for expected in 1..=3 {
            let message = TransactionMessage {
                import_job_id: Some(job.id),
                ..classified("user_1")
            };
            stage(&store).apply(message).await.unwrap();

            let current = store.job(job.id).unwrap();
            assert_eq!(current.processed, expected);
            let status = if expected == 3 {
                ImportJobStatus::Completed
            } else {
                ImportJobStatus::Pending
            };
            assert_eq!(current.status, status);
        }
    }

    #[tokio::test]
    async fn job_counter_failure_does_not_fail_the_message() {
        let store = Arc::new(MemoryStore::new());
        store.add_user("user_1");
        let job = ImportJobRepository::create(store.as_ref(), "user_1", 1, None)
            .await
            .unwrap();
        store.fail_job_updates(true);

        let message = TransactionMessage {
            import_job_id: Some(job.id),
            ..classified("user_1")
        };
        assert!(stage(&store).apply(message).await.is_ok());
        assert_eq!(store.transactions().len(), 1);
        assert_eq!(store.job(job.id).unwrap().processed, 0);
    }
}
