use crate::models::{ImportJob, ImportJobStatus};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobResponse {
    pub id: Uuid,
    pub user_id: String,
    pub status: ImportJobStatus,
    pub total: i32,
    pub processed: i32,
    pub credit_card_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ImportJob> for ImportJobResponse {
    fn from(job: ImportJob) -> Self {
        Self {
            id: job.id,
            user_id: job.user_id,
            status: job.status,
            total: job.total,
            processed: job.processed,
            credit_card_id: job.credit_card_id,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

/// Body of the 202 returned by an upload.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub job: ImportJobResponse,
}

impl ImportResponse {
    pub fn accepted(job: ImportJob) -> Self {
        let message = if job.total == 0 {
            "File contained no transactions".to_string()
        } else {
            format!("{} transactions queued for processing", job.total)
        };
        Self {
            message,
            job: job.into(),
        }
    }
}
