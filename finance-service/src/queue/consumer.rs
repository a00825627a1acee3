use super::{Delivery, MessageQueue, decode_message};
use crate::models::ImportJobStatus;
use crate::pipeline::TransactionChain;
use crate::repositories::ImportJobRepository;
use crate::services::metrics::{record_import_job, record_pipeline_message};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Persisted,
    /// The chain rejected the message. It is acknowledged and not retried.
    Rejected,
    Undecodable,
}

impl ConsumeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumeOutcome::Persisted => "persisted",
            ConsumeOutcome::Rejected => "rejected",
            ConsumeOutcome::Undecodable => "undecodable",
        }
    }
}

/// Single-flight consumer: the next message is received only after the
/// current one has been acknowledged.
pub struct TransactionConsumer {
    consumer_id: String,
    queue: Arc<dyn MessageQueue>,
    chain: Arc<TransactionChain>,
    import_jobs: Arc<dyn ImportJobRepository>,
    poll_timeout: Duration,
}

impl TransactionConsumer {
    pub fn new(
        consumer_id: impl Into<String>,
        queue: Arc<dyn MessageQueue>,
        chain: Arc<TransactionChain>,
        import_jobs: Arc<dyn ImportJobRepository>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            queue,
            chain,
            import_jobs,
            poll_timeout,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            consumer_id = %self.consumer_id,
            stages = ?self.chain.stage_names(),
            "Starting transaction consumer"
        );

        match self.queue.recover().await {
            Ok(0) => {}
            Ok(recovered) => {
                tracing::warn!(consumer_id = %self.consumer_id, recovered, "Redelivering unacknowledged messages");
            }
            Err(e) => {
                tracing::error!(consumer_id = %self.consumer_id, error = %e, "Failed to recover in-flight messages");
            }
        }

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.queue.receive(self.poll_timeout) => received,
            };

            match received {
                // A dequeued message always runs to its ack, even during shutdown.
                Ok(Some(delivery)) => {
                    self.handle(delivery).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(consumer_id = %self.consumer_id, error = %e, "Failed to receive from queue");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!(consumer_id = %self.consumer_id, "Transaction consumer stopped");
    }

    /// Receives at most one message, processes it and acknowledges it.
    /// `Ok(None)` means the poll timed out with nothing to do.
    pub async fn poll_once(&self) -> Result<Option<ConsumeOutcome>, AppError> {
        match self.queue.receive(self.poll_timeout).await? {
            Some(delivery) => Ok(Some(self.handle(delivery).await)),
            None => Ok(None),
        }
    }

    async fn handle(&self, delivery: Delivery) -> ConsumeOutcome {
        let outcome = self.process(&delivery).await;

        // Failed messages are acknowledged too; there is no redelivery.
        if let Err(e) = self.queue.ack(&delivery).await {
            tracing::error!(consumer_id = %self.consumer_id, error = %e, "Failed to acknowledge message");
        }
        outcome
    }

    async fn process(&self, delivery: &Delivery) -> ConsumeOutcome {
        let start = Instant::now();

        let outcome = match decode_message(&delivery.payload) {
            Ok(message) => {
                let import_job_id = message.import_job_id;
                match self.chain.run(message).await {
                    Ok(_) => ConsumeOutcome::Persisted,
                    Err(e) => {
                        tracing::error!(
                            consumer_id = %self.consumer_id,
                            import_job_id = ?import_job_id,
                            error = %e,
                            "Transaction processing failed"
                        );
                        if let Some(job_id) = import_job_id {
                            self.fail_job(job_id).await;
                        }
                        ConsumeOutcome::Rejected
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    consumer_id = %self.consumer_id,
                    error = %e,
                    "Discarding undecodable message"
                );
                if let Some(job_id) = readable_job_id(&delivery.payload) {
                    self.fail_job(job_id).await;
                }
                ConsumeOutcome::Undecodable
            }
        };

        record_pipeline_message(outcome.as_str(), start.elapsed().as_secs_f64());
        outcome
    }

    async fn fail_job(&self, job_id: Uuid) {
        match self
            .import_jobs
            .mark_status(job_id, ImportJobStatus::Failed)
            .await
        {
            Ok(true) => {
                tracing::warn!(job_id = %job_id, "Import job marked failed");
                record_import_job(ImportJobStatus::Failed.as_str());
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark import job failed");
            }
        }
    }
}

/// Best-effort read of `importJobId` from a payload that does not decode
/// as a full message.
fn readable_job_id(payload: &[u8]) -> Option<Uuid> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    value.get("importJobId")?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_job_id_from_partially_valid_payload() {
        let id = Uuid::new_v4();
        let payload = format!(r#"{{"userId": 42, "importJobId": "{}"}}"#, id);
        assert_eq!(readable_job_id(payload.as_bytes()), Some(id));
    }

    #[test]
    fn unreadable_payload_has_no_job_id() {
        assert_eq!(readable_job_id(b"\x00\x01garbage"), None);
        assert_eq!(readable_job_id(br#"{"importJobId": "nope"}"#), None);
    }
}
