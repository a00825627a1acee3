//! Transaction classification collaborators.
//!
//! A [`Classifier`] never fails: any problem reaching or understanding the
//! model degrades to [`Classification::fallback`].

pub mod fallback;
pub mod openai;

pub use fallback::FallbackClassifier;
pub use openai::{OpenAiClassifier, OpenAiConfig};

use crate::models::{PaymentMethod, TransactionCategory, TransactionType};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub payment_method: PaymentMethod,
    pub category_id: Option<Uuid>,
    /// Free-form user category suggested by the model.
    pub category_name: Option<String>,
}

impl Classification {
    pub fn fallback() -> Self {
        Self {
            transaction_type: TransactionType::Expense,
            category: TransactionCategory::Other,
            payment_method: PaymentMethod::CreditCard,
            category_id: None,
            category_name: None,
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, title: &str, category_hint: Option<&str>) -> Classification;
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Value outside allowed set: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    #[serde(rename = "type")]
    transaction_type: String,
    category: String,
    payment_method: String,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
}

/// Remove a surrounding Markdown code fence, tagged or not.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Decode a model reply into a classification, rejecting any value outside
/// the known enum sets.
pub fn parse_classification(content: &str) -> Result<Classification, ClassifierError> {
    let raw: RawClassification = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

    let transaction_type = TransactionType::parse(&raw.transaction_type)
        .ok_or_else(|| ClassifierError::InvalidValue(format!("type={}", raw.transaction_type)))?;
    let category = TransactionCategory::parse(&raw.category)
        .ok_or_else(|| ClassifierError::InvalidValue(format!("category={}", raw.category)))?;
    let payment_method = PaymentMethod::parse(&raw.payment_method).ok_or_else(|| {
        ClassifierError::InvalidValue(format!("paymentMethod={}", raw.payment_method))
    })?;

    Ok(Classification {
        transaction_type,
        category,
        payment_method,
        category_id: raw
            .category_id
            .and_then(|id| Uuid::parse_str(id.trim()).ok()),
        category_name: raw
            .category_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    })
}
