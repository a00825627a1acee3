use super::Stage;
use crate::classifier::Classifier;
use crate::error::FinanceError;
use crate::models::TransactionMessage;
use crate::repositories::CategoryRepository;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Fills type, category and payment method from the classifier.
///
/// When the classifier names a user category, the stage links it by id,
/// creating the category if the user does not have one with that name.
pub struct ClassifyStage {
    classifier: Arc<dyn Classifier>,
    categories: Arc<dyn CategoryRepository>,
}

impl ClassifyStage {
    pub fn new(classifier: Arc<dyn Classifier>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self {
            classifier,
            categories,
        }
    }

    async fn resolve_category(&self, user_id: &str, name: &str) -> Option<Uuid> {
        let wanted = name.to_lowercase();
        let existing = match self.categories.list_by_user(user_id).await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Failed to list categories");
                return None;
            }
        };

        if let Some(category) = existing.iter().find(|c| c.name.to_lowercase() == wanted) {
            return Some(category.id);
        }

        match self.categories.create(user_id, name).await {
            Ok(category) => {
                tracing::info!(category_id = %category.id, name = %category.name, "Created category from classification");
                Some(category.id)
            }
            Err(e) => {
                tracing::warn!(error = %e, name = %name, "Failed to create category");
                None
            }
        }
    }
}

#[async_trait]
impl Stage for ClassifyStage {
    fn name(&self) -> &'static str {
        "classify"
    }

    async fn apply(&self, message: TransactionMessage) -> Result<TransactionMessage, FinanceError> {
        let Some(name) = message.name.as_deref() else {
            return Ok(message);
        };
        let hint = message.category.map(|c| c.as_str());
        let classification = self.classifier.classify(name, hint).await;

        tracing::debug!(
            transaction_type = classification.transaction_type.as_str(),
            category = classification.category.as_str(),
            payment_method = classification.payment_method.as_str(),
            "Transaction classified"
        );

        let category_id = match (message.category_id, classification.category_id) {
            (Some(id), _) | (None, Some(id)) => Some(id),
            (None, None) => match classification.category_name.as_deref() {
                Some(category_name) => {
                    self.resolve_category(message.user_id.trim(), category_name)
                        .await
                }
                None => None,
            },
        };

        Ok(TransactionMessage {
            transaction_type: Some(classification.transaction_type),
            category: Some(classification.category),
            payment_method: Some(classification.payment_method),
            category_id,
            ..message
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classification, FallbackClassifier};
    use crate::models::{PaymentMethod, TransactionCategory, TransactionType};
    use crate::repositories::MemoryStore;

    struct Suggests(Option<&'static str>);

    #[async_trait]
    impl Classifier for Suggests {
        async fn classify(&self, _title: &str, hint: Option<&str>) -> Classification {
            assert_eq!(hint, Some("FOOD"));
            Classification {
                transaction_type: TransactionType::Expense,
                category: TransactionCategory::Food,
                payment_method: PaymentMethod::DebitCard,
                category_id: None,
                category_name: self.0.map(str::to_string),
            }
        }
    }

    fn message() -> TransactionMessage {
        TransactionMessage {
            user_id: "user_1".to_string(),
            name: Some("padaria".to_string()),
            category: Some(TransactionCategory::Food),
            transaction_type: Some(TransactionType::Deposit),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn overrides_file_values_with_classification() {
        let store = Arc::new(MemoryStore::new());
        let stage = ClassifyStage::new(Arc::new(Suggests(None)), store);

        let out = stage.apply(message()).await.unwrap();
        assert_eq!(out.transaction_type, Some(TransactionType::Expense));
        assert_eq!(out.payment_method, Some(PaymentMethod::DebitCard));
        assert_eq!(out.category_id, None);
    }

    #[tokio::test]
    async fn links_existing_category_ignoring_case() {
        let store = Arc::new(MemoryStore::new());
        let existing = CategoryRepository::create(store.as_ref(), "user_1", "Padaria")
            .await
            .unwrap();
        let stage = ClassifyStage::new(Arc::new(Suggests(Some("PADARIA"))), store.clone());

        let out = stage.apply(message()).await.unwrap();
        assert_eq!(out.category_id, Some(existing.id));
        assert_eq!(store.categories().len(), 1);
    }

    #[tokio::test]
    async fn creates_missing_category() {
        let store = Arc::new(MemoryStore::new());
        let stage = ClassifyStage::new(Arc::new(Suggests(Some("Padaria"))), store.clone());

        let out = stage.apply(message()).await.unwrap();
        let categories = store.categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(out.category_id, Some(categories[0].id));
    }

    #[tokio::test]
    async fn skips_classifier_without_name() {
        let store = Arc::new(MemoryStore::new());
        let stage = ClassifyStage::new(Arc::new(FallbackClassifier), store);
        let input = TransactionMessage {
            user_id: "user_1".to_string(),
            ..Default::default()
        };

        let out = stage.apply(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }
}
