use super::{Delivery, MessageQueue};
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// In-process queue with the Redis adapter's delivery semantics.
#[derive(Default)]
pub struct InMemoryQueue {
    ready: Mutex<VecDeque<Vec<u8>>>,
    in_flight: Mutex<Vec<Vec<u8>>>,
    available: Notify,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ready_len(&self) -> usize {
        self.ready.lock().await.len()
    }

    pub async fn in_flight_len(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), AppError> {
        self.ready.lock().await.push_back(payload);
        self.available.notify_one();
        Ok(())
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<Delivery>, AppError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let next = self.ready.lock().await.pop_front();
            if let Some(payload) = next {
                self.in_flight.lock().await.push(payload.clone());
                return Ok(Some(Delivery { payload }));
            }
            if tokio::time::timeout_at(deadline, self.available.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), AppError> {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(pos) = in_flight.iter().position(|p| *p == delivery.payload) {
            in_flight.remove(pos);
        }
        Ok(())
    }

    async fn recover(&self) -> Result<usize, AppError> {
        let mut ready = self.ready.lock().await;
        let mut in_flight = self.in_flight.lock().await;
        let count = in_flight.len();
        for payload in in_flight.drain(..).rev() {
            ready.push_front(payload);
        }
        if count > 0 {
            self.available.notify_one();
        }
        Ok(count)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let queue = InMemoryQueue::new();
        for payload in [b"a".to_vec(), b"b".to_vec()] {
            queue.publish(payload).await.unwrap();
        }

        let first = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(first.payload, b"a");
        queue.ack(&first).await.unwrap();
        let second = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(second.payload, b"b");
    }

    #[tokio::test]
    async fn receive_times_out_when_empty() {
        let queue = InMemoryQueue::new();
        let delivery = queue.receive(Duration::from_millis(20)).await.unwrap();
        assert!(delivery.is_none());
    }

    #[tokio::test]
    async fn unacked_message_is_redelivered_after_recovery() {
        let queue = InMemoryQueue::new();
        queue.publish(b"first".to_vec()).await.unwrap();
        queue.publish(b"second".to_vec()).await.unwrap();

        let delivery = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(queue.in_flight_len().await, 1);

        assert_eq!(queue.recover().await.unwrap(), 1);
        let again = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(again, delivery);
    }

    #[tokio::test]
    async fn ack_removes_in_flight_message() {
        let queue = InMemoryQueue::new();
        queue.publish(b"only".to_vec()).await.unwrap();
        let delivery = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        queue.ack(&delivery).await.unwrap();

        assert_eq!(queue.in_flight_len().await, 0);
        assert_eq!(queue.recover().await.unwrap(), 0);
        assert_eq!(queue.ready_len().await, 0);
    }

    #[tokio::test]
    async fn waiting_receiver_wakes_on_publish() {
        let queue = std::sync::Arc::new(InMemoryQueue::new());
        let receiver = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.receive(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.publish(b"late".to_vec()).await.unwrap();

        let delivery = receiver.await.unwrap().unwrap().unwrap();
        assert_eq!(delivery.payload, b"late");
    }
}
