//! Upload entry point: parse the file, open an import job and enqueue one
//! message per parsed transaction.

use crate::error::FinanceError;
use crate::models::{ImportJob, ImportJobStatus, TransactionMessage};
use crate::parsers::parse_only;
use crate::queue::{MessageQueue, publish_message};
use crate::repositories::{CreditCardRepository, ImportJobRepository, UserRepository};
use crate::services::metrics::record_import_job;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub struct ImportService {
    users: Arc<dyn UserRepository>,
    cards: Arc<dyn CreditCardRepository>,
    import_jobs: Arc<dyn ImportJobRepository>,
    queue: Arc<dyn MessageQueue>,
}

impl ImportService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cards: Arc<dyn CreditCardRepository>,
        import_jobs: Arc<dyn ImportJobRepository>,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            users,
            cards,
            import_jobs,
            queue,
        }
    }

    /// Format errors surface before any job exists. A publish failure
    /// marks the job FAILED and is returned to the caller.
    #[instrument(skip(self, content), fields(user_id = %user_id, size = content.len()))]
    pub async fn start_import(
        &self,
        user_id: &str,
        content: &[u8],
        credit_card_id: Option<Uuid>,
    ) -> Result<ImportJob, FinanceError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(FinanceError::InvalidUser);
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(FinanceError::UserNotFound(user_id.to_string()));
        }

        if let Some(card_id) = credit_card_id {
            let owned = self
                .cards
                .find_by_id(card_id)
                .await?
                .is_some_and(|card| card.user_id == user_id);
            if !owned {
                return Err(FinanceError::InvalidArgument(format!(
                    "Credit card {} not found",
                    card_id
                )));
            }
        }

        let parsed = parse_only(content)?;
        let total = i32::try_from(parsed.len()).map_err(|_| {
            FinanceError::InvalidArgument("Too many transactions in one file".to_string())
        })?;

        let job = self
            .import_jobs
            .create(user_id, total, credit_card_id)
            .await?;
        tracing::info!(job_id = %job.id, total, "Import job created");

        if parsed.is_empty() {
            self.import_jobs
                .mark_status(job.id, ImportJobStatus::Completed)
                .await?;
            record_import_job(ImportJobStatus::Completed.as_str());
            return self.find_job(job.id).await;
        }

        for transaction in parsed {
            let message =
                TransactionMessage::from_parsed(user_id, transaction, Some(job.id), credit_card_id);
            if let Err(e) = publish_message(self.queue.as_ref(), &message).await {
                tracing::error!(job_id = %job.id, error = %e, "Failed to enqueue transaction");
                if let Err(mark_err) = self
                    .import_jobs
                    .mark_status(job.id, ImportJobStatus::Failed)
                    .await
                {
                    tracing::error!(job_id = %job.id, error = %mark_err, "Failed to mark import job failed");
                } else {
                    record_import_job(ImportJobStatus::Failed.as_str());
                }
                return Err(FinanceError::Storage(e));
            }
        }

        tracing::info!(job_id = %job.id, total, "Import transactions enqueued");
        Ok(job)
    }

    /// Jobs of other users are reported as missing.
    #[instrument(skip(self), fields(user_id = %user_id, job_id = %job_id))]
    pub async fn get_job(&self, user_id: &str, job_id: Uuid) -> Result<ImportJob, FinanceError> {
        let job = self.find_job(job_id).await?;
        if job.user_id != user_id.trim() {
            return Err(FinanceError::NotFound("Import job"));
        }
        Ok(job)
    }

    async fn find_job(&self, job_id: Uuid) -> Result<ImportJob, FinanceError> {
        self.import_jobs
            .find_by_id(job_id)
            .await?
            .ok_or(FinanceError::NotFound("Import job"))
    }
}
