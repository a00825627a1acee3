use super::Stage;
use crate::error::FinanceError;
use crate::models::TransactionMessage;
use async_trait::async_trait;

/// Trims and lowercases the transaction name.
pub struct NormalizeStage;

#[async_trait]
impl Stage for NormalizeStage {
    fn name(&self) -> &'static str {
        "normalize"
    }

    async fn apply(&self, message: TransactionMessage) -> Result<TransactionMessage, FinanceError> {
        let name = message.name.map(|n| n.trim().to_lowercase());
        Ok(TransactionMessage { name, ..message })
    }
}
