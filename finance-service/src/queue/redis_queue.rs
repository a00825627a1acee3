use super::{Delivery, MessageQueue};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use service_core::error::AppError;
use std::time::Duration;

/// Redis list transport. Each consumer owns a processing list that holds
/// its in-flight message until acknowledged.
#[derive(Clone)]
pub struct RedisQueue {
    _client: Client,
    producer: ConnectionManager,
    consumer: ConnectionManager,
    queue: String,
    processing: String,
}

impl RedisQueue {
    pub async fn new(url: &str, queue: &str, consumer_id: &str) -> Result<Self, AppError> {
        tracing::info!(queue = %queue, consumer_id = %consumer_id, "Connecting to Redis");
        let client = Client::open(url)?;

        // Blocking receives must not stall publishes on a shared connection.
        let producer = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            e
        })?;
        let consumer = client.get_connection_manager().await?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            producer,
            consumer,
            queue: queue.to_string(),
            processing: format!("{}:processing:{}", queue, consumer_id),
        })
    }
}

#[async_trait]
impl MessageQueue for RedisQueue {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), AppError> {
        let mut conn = self.producer.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.queue)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<Delivery>, AppError> {
        let mut conn = self.consumer.clone();
        let payload: Option<Vec<u8>> = redis::cmd("BLMOVE")
            .arg(&self.queue)
            .arg(&self.processing)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;
        Ok(payload.map(|payload| Delivery { payload }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), AppError> {
        let mut conn = self.consumer.clone();
        let _: i64 = redis::cmd("LREM")
            .arg(&self.processing)
            .arg(1)
            .arg(&delivery.payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Moves messages a previous run left unacknowledged back to the
    /// delivery end of the queue, oldest first.
    async fn recover(&self) -> Result<usize, AppError> {
        let mut conn = self.consumer.clone();
        let mut recovered = 0;
        loop {
            let moved: Option<Vec<u8>> = redis::cmd("LMOVE")
                .arg(&self.processing)
                .arg(&self.queue)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            tracing::warn!(
                queue = %self.queue,
                recovered,
                "Requeued unacknowledged messages"
            );
        }
        Ok(recovered)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        let mut conn = self.producer.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
