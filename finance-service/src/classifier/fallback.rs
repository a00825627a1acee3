use super::{Classification, Classifier};
use async_trait::async_trait;

/// Classifier used when no model is configured.
#[derive(Debug, Clone, Default)]
pub struct FallbackClassifier;

#[async_trait]
impl Classifier for FallbackClassifier {
    async fn classify(&self, _title: &str, _category_hint: Option<&str>) -> Classification {
        crate::services::metrics::record_classifier_result("fallback");
        Classification::fallback()
    }
}
