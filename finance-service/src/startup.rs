//! Application startup and lifecycle management.

use crate::classifier::{Classifier, FallbackClassifier, OpenAiClassifier};
use crate::config::FinanceConfig;
use crate::handlers;
use crate::pipeline::TransactionChain;
use crate::queue::{MessageQueue, RedisQueue, TransactionConsumer};
use crate::repositories::Repositories;
use crate::services::{
    CardStatementService, Database, ImportService, NotificationService, PayablesService,
    SettlementService, init_metrics,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub queue: Arc<dyn MessageQueue>,
    pub imports: Arc<ImportService>,
    pub payables: Arc<PayablesService>,
    pub settlement: Arc<SettlementService>,
    pub card_statements: Arc<CardStatementService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    pub fn new(repos: Repositories, queue: Arc<dyn MessageQueue>) -> Self {
        Self {
            imports: Arc::new(ImportService::new(
                repos.users.clone(),
                repos.cards.clone(),
                repos.import_jobs.clone(),
                queue.clone(),
            )),
            payables: Arc::new(PayablesService::new(repos.transactions.clone())),
            settlement: Arc::new(SettlementService::new(
                repos.cards.clone(),
                repos.transactions.clone(),
            )),
            card_statements: Arc::new(CardStatementService::new(
                repos.cards.clone(),
                repos.transactions.clone(),
            )),
            notifications: Arc::new(NotificationService::new(
                repos.notifications.clone(),
                repos.transactions.clone(),
            )),
            repos,
            queue,
        }
    }
}

pub fn build_router(state: AppState, upload_max_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/imports", post(handlers::upload_statement))
        .route("/imports/:id", get(handlers::get_import_job))
        .route("/payables", get(handlers::get_payables))
        .route("/payables/settle", post(handlers::settle))
        .route(
            "/credit-cards/spending-summary",
            get(handlers::get_spending_summary),
        )
        .route(
            "/credit-cards/:id/statement",
            get(handlers::get_card_statement),
        )
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .route(
            "/notifications/check-due-dates",
            post(handlers::check_due_dates),
        )
        .route(
            "/notifications/:id/read",
            patch(handlers::mark_notification_read),
        )
        .layer(DefaultBodyLimit::max(upload_max_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn build_classifier(config: &FinanceConfig) -> Arc<dyn Classifier> {
    match config.classifier.openai() {
        Some(openai) => match OpenAiClassifier::new(openai) {
            Ok(classifier) => {
                tracing::info!(model = %config.classifier.model, "Using OpenAI classifier");
                Arc::new(classifier)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build OpenAI classifier, using fallback values");
                Arc::new(FallbackClassifier)
            }
        },
        None => {
            tracing::info!("OPENAI_API_KEY not set, using fallback classifier");
            Arc::new(FallbackClassifier)
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    consumer: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: FinanceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: FinanceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: FinanceConfig, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let repos = Repositories::from_store(Arc::new(db));

        let queue: Arc<dyn MessageQueue> = Arc::new(
            RedisQueue::new(
                config.queue.redis_url.expose_secret(),
                &config.queue.name,
                &config.queue.consumer_id,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to Redis");
                e
            })?,
        );

        let shutdown = CancellationToken::new();

        let consumer = if config.queue.consumer_enabled {
            let chain = Arc::new(TransactionChain::standard(
                &repos,
                build_classifier(&config),
            ));
            let consumer = TransactionConsumer::new(
                config.queue.consumer_id.clone(),
                queue.clone(),
                chain,
                repos.import_jobs.clone(),
                config.queue.poll_timeout,
            );
            Some(tokio::spawn(consumer.run(shutdown.clone())))
        } else {
            tracing::info!("Transaction consumer disabled");
            None
        };

        let state = AppState::new(repos, queue);
        let app = build_router(state.clone(), config.upload_max_bytes);

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(
            http_port = http_port,
            queue = %config.queue.name,
            "Finance service listener bound"
        );

        let server = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned());

        Ok(Self {
            http_port,
            server: Box::new(server.into_future()),
            consumer,
            shutdown,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Cancelling this token drains the HTTP server and stops the consumer
    /// after its in-flight message.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let result = self.server.await;
        self.shutdown.cancel();

        if let Some(consumer) = self.consumer {
            if let Err(e) = consumer.await {
                tracing::error!(error = %e, "Transaction consumer task failed");
            }
        }

        result
    }
}
