//! Common test utilities for finance-service integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{NaiveDate, Utc};
use finance_service::classifier::FallbackClassifier;
use finance_service::models::{
    CreditCard, PaymentMethod, PaymentStatus, Transaction, TransactionCategory, TransactionType,
};
use finance_service::pipeline::TransactionChain;
use finance_service::queue::{ConsumeOutcome, InMemoryQueue, TransactionConsumer};
use finance_service::repositories::{MemoryStore, Repositories};
use finance_service::startup::{AppState, build_router};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Once};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

static INIT: Once = Once::new();

pub const UPLOAD_MAX_BYTES: usize = 1024 * 1024;
const BOUNDARY: &str = "finance-test-boundary";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,finance_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// The HTTP surface and the consumer wired over one in-memory store and queue.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<InMemoryQueue>,
    pub repos: Repositories,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        init_tracing();

        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let repos = Repositories::from_store(store.clone());
        let state = AppState::new(repos.clone(), queue.clone());

        Self {
            store,
            queue,
            repos,
            router: build_router(state, UPLOAD_MAX_BYTES),
        }
    }

    pub fn consumer(&self) -> TransactionConsumer {
        let chain = TransactionChain::standard(&self.repos, Arc::new(FallbackClassifier));
        TransactionConsumer::new(
            "worker-test",
            self.queue.clone(),
            Arc::new(chain),
            self.repos.import_jobs.clone(),
            Duration::from_millis(20),
        )
    }

    /// Consume until the queue is empty, returning each outcome in order.
    pub async fn drain(&self) -> Vec<ConsumeOutcome> {
        let consumer = self.consumer();
        let mut outcomes = Vec::new();
        while let Some(outcome) = consumer.poll_once().await.expect("queue receive") {
            outcomes.push(outcome);
        }
        outcomes
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, user_id: &str) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .uri(uri)
                .header("X-User-ID", user_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        user_id: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("X-User-ID", user_id)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn upload(
        &self,
        user_id: &str,
        file: &str,
        credit_card_id: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/imports")
                .header("X-User-ID", user_id)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(multipart_body(file, credit_card_id))
                .unwrap(),
        )
        .await
    }
}

pub fn multipart_body(file: &str, credit_card_id: Option<&str>) -> Body {
    let mut body = String::new();
    if let Some(card) = credit_card_id {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"creditCardId\"\r\n\r\n{card}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"statement\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{file}\r\n--{BOUNDARY}--\r\n"
    ));
    Body::from(body)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub fn card(user_id: &str, name: &str, due_day: Option<u32>, closing_day: Option<u32>) -> CreditCard {
    CreditCard {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        last_four_digits: Some("4242".to_string()),
        brand: Some("VISA".to_string()),
        due_day,
        closing_day,
        limit: Some(dec("1000.00")),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A pending transaction; adjust fields with struct update syntax.
pub fn transaction(
    user_id: &str,
    transaction_type: TransactionType,
    amount: &str,
    date: NaiveDate,
) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        name: "item".to_string(),
        description: None,
        amount: dec(amount),
        date,
        due_date: None,
        transaction_type,
        category: TransactionCategory::Other,
        category_id: None,
        payment_method: PaymentMethod::Pix,
        is_recurring: false,
        payment_status: PaymentStatus::Pending,
        paid_at: None,
        credit_card_id: None,
        import_job_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}
