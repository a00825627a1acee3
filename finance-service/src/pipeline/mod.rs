//! Per-message transaction processing chain: normalize, classify, persist.
//!
//! Stages are fixed at construction and run in order by [`TransactionChain::run`].
//! Each stage takes the message by value and hands back the enriched copy;
//! the first error stops the chain.

pub mod classify;
pub mod normalize;
pub mod persist;

pub use classify::ClassifyStage;
pub use normalize::NormalizeStage;
pub use persist::PersistStage;

use crate::classifier::Classifier;
use crate::error::FinanceError;
use crate::models::TransactionMessage;
use crate::repositories::Repositories;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, message: TransactionMessage) -> Result<TransactionMessage, FinanceError>;
}

pub struct TransactionChain {
    stages: Vec<Box<dyn Stage>>,
}

impl TransactionChain {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Normalize -> Classify -> Persist over the given collaborators.
    pub fn standard(repos: &Repositories, classifier: Arc<dyn Classifier>) -> Self {
        Self::new(vec![
            Box::new(NormalizeStage),
            Box::new(ClassifyStage::new(classifier, repos.categories.clone())),
            Box::new(PersistStage::new(
                repos.users.clone(),
                repos.cards.clone(),
                repos.transactions.clone(),
                repos.import_jobs.clone(),
            )),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    #[instrument(skip_all, fields(user_id = %message.user_id, job_id = ?message.import_job_id))]
    pub async fn run(&self, message: TransactionMessage) -> Result<TransactionMessage, FinanceError> {
        let mut current = message;
        for stage in &self.stages {
            tracing::debug!(stage = stage.name(), "Running pipeline stage");
            current = stage.apply(current).await.map_err(|e| {
                tracing::debug!(stage = stage.name(), error = %e, "Pipeline stage failed");
                e
            })?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag(&'static str);

    #[async_trait]
    impl Stage for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn apply(
            &self,
            mut message: TransactionMessage,
        ) -> Result<TransactionMessage, FinanceError> {
            let trail = message.description.take().unwrap_or_default();
            message.description = Some(format!("{}{}", trail, self.0));
            Ok(message)
        }
    }

    struct Reject;

    #[async_trait]
    impl Stage for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        async fn apply(&self, _: TransactionMessage) -> Result<TransactionMessage, FinanceError> {
            Err(FinanceError::InvalidArgument("rejected".to_string()))
        }
    }

    #[tokio::test]
    async fn runs_stages_in_order() {
        let chain = TransactionChain::new(vec![Box::new(Tag("a")), Box::new(Tag("b")), Box::new(Tag("c"))]);
        let out = chain.run(TransactionMessage::default()).await.unwrap();

        assert_eq!(out.description.as_deref(), Some("abc"));
        assert_eq!(chain.stage_names(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn first_error_short_circuits() {
        let chain = TransactionChain::new(vec![Box::new(Tag("a")), Box::new(Reject), Box::new(Tag("c"))]);
        assert!(matches!(
            chain.run(TransactionMessage::default()).await,
            Err(FinanceError::InvalidArgument(_))
        ));
    }
}
