//! Durable transaction queue: at-least-once delivery, one message in flight
//! per consumer, explicit acknowledgement.

mod consumer;
mod memory;
mod redis_queue;

pub use consumer::{ConsumeOutcome, TransactionConsumer};
pub use memory::InMemoryQueue;
pub use redis_queue::RedisQueue;

use crate::models::TransactionMessage;
use async_trait::async_trait;
use service_core::error::AppError;
use std::time::Duration;

pub const DEFAULT_QUEUE_NAME: &str = "finance:transactions";

/// A message handed to a consumer. It stays in the consumer's in-flight
/// set until acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), AppError>;

    /// Waits up to `timeout` for the next message.
    async fn receive(&self, timeout: Duration) -> Result<Option<Delivery>, AppError>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), AppError>;

    /// Returns messages this consumer left unacknowledged to the queue.
    async fn recover(&self) -> Result<usize, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

pub fn encode_message(message: &TransactionMessage) -> Result<Vec<u8>, AppError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode_message(payload: &[u8]) -> Result<TransactionMessage, serde_json::Error> {
    serde_json::from_slice(payload)
}

pub async fn publish_message(
    queue: &dyn MessageQueue,
    message: &TransactionMessage,
) -> Result<(), AppError> {
    queue.publish(encode_message(message)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn decodes_producer_payload_with_timestamp_date() {
        let payload = br#"{
            "userId": "user_1",
            "name": "Padaria",
            "amount": "12.50",
            "date": "2026-02-06T00:00:00.000Z",
            "importJobId": "4f0c4a57-04f4-4b87-9d0a-0d5a3b4f6a11"
        }"#;

        let message = decode_message(payload).unwrap();
        assert_eq!(message.user_id, "user_1");
        assert_eq!(message.amount, Some(Decimal::from_str("12.50").unwrap()));
        assert_eq!(message.date, NaiveDate::from_ymd_opt(2026, 2, 6));
        assert!(message.import_job_id.is_some());
        assert!(message.transaction_type.is_none());
    }

    #[test]
    fn encoded_message_omits_absent_fields() {
        let message = TransactionMessage {
            user_id: "user_1".to_string(),
            name: Some("padaria".to_string()),
            ..Default::default()
        };
        let value: serde_json::Value =
            serde_json::from_slice(&encode_message(&message).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"userId": "user_1", "name": "padaria"}));
    }

    #[test]
    fn rejects_non_json_payload() {
        assert!(decode_message(b"not json").is_err());
    }
}
