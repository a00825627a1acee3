//! Marks a single transaction or a whole card statement as paid or unpaid.

use crate::billing::{Period, resolve_due_date};
use crate::error::FinanceError;
use crate::models::{SettlementMode, SettlementScope};
use crate::repositories::{CreditCardRepository, TransactionRepository};
use crate::services::metrics::record_settlement;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct CardSettlementTarget {
    pub credit_card_id: Uuid,
    /// Any date in the invoice month to settle.
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRequest {
    pub mode: SettlementMode,
    pub scope: SettlementScope,
    pub transaction_id: Option<Uuid>,
    pub card: Option<CardSettlementTarget>,
}

pub struct SettlementService {
    cards: Arc<dyn CreditCardRepository>,
    transactions: Arc<dyn TransactionRepository>,
}

impl SettlementService {
    pub fn new(
        cards: Arc<dyn CreditCardRepository>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            cards,
            transactions,
        }
    }

    /// Returns the number of resolved ids, which stays the same when the
    /// same set is settled again.
    #[instrument(skip(self, request), fields(user_id = %user_id, mode = request.mode.as_str(), scope = request.scope.as_str()))]
    pub async fn execute(
        &self,
        user_id: &str,
        request: &SettlementRequest,
    ) -> Result<u64, FinanceError> {
        let ids = self.resolve_ids(user_id, request).await?;
        if ids.is_empty() {
            return Err(FinanceError::NoTransactionsResolved);
        }

        match request.mode {
            SettlementMode::Pay => {
                self.transactions
                    .mark_as_paid(user_id, &ids, Utc::now())
                    .await?;
            }
            SettlementMode::Unpay => {
                self.transactions.mark_as_pending(user_id, &ids).await?;
            }
        }

        record_settlement(request.mode.as_str(), request.scope.as_str());
        tracing::info!(count = ids.len(), "Transactions settled");

        Ok(ids.len() as u64)
    }

    async fn resolve_ids(
        &self,
        user_id: &str,
        request: &SettlementRequest,
    ) -> Result<Vec<Uuid>, FinanceError> {
        match request.scope {
            SettlementScope::Transaction => {
                let id = request.transaction_id.ok_or_else(|| {
                    FinanceError::InvalidArgument(
                        "transactionId is required for TRANSACTION scope".to_string(),
                    )
                })?;
                let found = self.transactions.find_by_id(user_id, id).await?;
                Ok(found.map(|t| t.id).into_iter().collect())
            }
            SettlementScope::CardStatement => {
                let target = request.card.as_ref().ok_or_else(|| {
                    FinanceError::InvalidArgument(
                        "card is required for CARD_STATEMENT scope".to_string(),
                    )
                })?;
                self.resolve_statement(user_id, target).await
            }
        }
    }

    /// Card transactions whose resolved due date lands in the target month.
    /// Without a card schedule only explicit due dates can match.
    async fn resolve_statement(
        &self,
        user_id: &str,
        target: &CardSettlementTarget,
    ) -> Result<Vec<Uuid>, FinanceError> {
        let schedule = self
            .cards
            .find_by_id(target.credit_card_id)
            .await?
            .filter(|card| card.user_id == user_id)
            .map(|card| card.schedule());

        let month = Period::month_of(target.due_date);
        let ids = self
            .transactions
            .list_by_credit_card(user_id, target.credit_card_id)
            .await?
            .into_iter()
            .filter(|t| {
                resolve_due_date(t.due_date, t.date, schedule.as_ref())
                    .is_some_and(|due| month.contains(due))
            })
            .map(|t| t.id)
            .collect();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreditCard, PaymentMethod, PaymentStatus, Transaction, TransactionCategory,
        TransactionType,
    };
    use crate::repositories::MemoryStore;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn card(user_id: &str, due_day: Option<u32>) -> CreditCard {
        CreditCard {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: "Visa".to_string(),
            last_four_digits: None,
            brand: None,
            due_day,
            closing_day: Some(5),
            limit: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn transaction(card_id: Option<Uuid>, date: NaiveDate, due: Option<NaiveDate>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            name: "item".to_string(),
            description: None,
            amount: Decimal::from(10),
            date,
            due_date: due,
            transaction_type: TransactionType::Expense,
            category: TransactionCategory::Other,
            category_id: None,
            payment_method: PaymentMethod::CreditCard,
            is_recurring: false,
            payment_status: PaymentStatus::Pending,
            paid_at: None,
            credit_card_id: card_id,
            import_job_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn service(store: &Arc<MemoryStore>) -> SettlementService {
        SettlementService::new(store.clone(), store.clone())
    }

    fn statement_request(mode: SettlementMode, card_id: Uuid, due: NaiveDate) -> SettlementRequest {
        SettlementRequest {
            mode,
            scope: SettlementScope::CardStatement,
            transaction_id: None,
            card: Some(CardSettlementTarget {
                credit_card_id: card_id,
                due_date: due,
            }),
        }
    }

    #[tokio::test]
    async fn statement_uses_closing_day_to_place_purchases() {
        let store = Arc::new(MemoryStore::new());
        let visa = card("user_1", Some(10));
        store.add_card(visa.clone());
        let after_closing = transaction(Some(visa.id), date(2026, 2, 6), None);
        let before_closing = transaction(Some(visa.id), date(2026, 2, 4), None);
        store.add_transaction(after_closing.clone());
        store.add_transaction(before_closing.clone());

        let updated = service(&store)
            .execute("user_1", &statement_request(SettlementMode::Pay, visa.id, date(2026, 3, 10)))
            .await
            .unwrap();

        assert_eq!(updated, 1);
        let rows = store.transactions();
        let status_of = |id| rows.iter().find(|t| t.id == id).unwrap().payment_status;
        assert_eq!(status_of(after_closing.id), PaymentStatus::Paid);
        assert_eq!(status_of(before_closing.id), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn settling_twice_reports_the_same_count() {
        let store = Arc::new(MemoryStore::new());
        let visa = card("user_1", Some(10));
        store.add_card(visa.clone());
        store.add_transaction(transaction(Some(visa.id), date(2026, 2, 6), None));
        store.add_transaction(transaction(Some(visa.id), date(2026, 1, 1), Some(date(2026, 3, 31))));

        let request = statement_request(SettlementMode::Pay, visa.id, date(2026, 3, 1));
        assert_eq!(service(&store).execute("user_1", &request).await.unwrap(), 2);
        assert_eq!(service(&store).execute("user_1", &request).await.unwrap(), 2);
        assert!(store
            .transactions()
            .iter()
            .all(|t| t.payment_status == PaymentStatus::Paid && t.paid_at.is_some()));

        let undo = statement_request(SettlementMode::Unpay, visa.id, date(2026, 3, 1));
        assert_eq!(service(&store).execute("user_1", &undo).await.unwrap(), 2);
        assert!(store
            .transactions()
            .iter()
            .all(|t| t.payment_status == PaymentStatus::Pending && t.paid_at.is_none()));
    }

    #[tokio::test]
    async fn card_without_due_day_only_matches_explicit_due_dates() {
        let store = Arc::new(MemoryStore::new());
        let card = card("user_1", None);
        store.add_card(card.clone());
        store.add_transaction(transaction(Some(card.id), date(2026, 2, 6), None));
        let explicit = transaction(Some(card.id), date(2026, 2, 6), Some(date(2026, 3, 15)));
        store.add_transaction(explicit.clone());

        let request = statement_request(SettlementMode::Pay, card.id, date(2026, 3, 10));
        assert_eq!(service(&store).execute("user_1", &request).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_resolution_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let visa = card("user_1", Some(10));
        store.add_card(visa.clone());

        let request = statement_request(SettlementMode::Pay, visa.id, date(2026, 3, 10));
        let result = service(&store).execute("user_1", &request).await;
        assert!(matches!(result, Err(FinanceError::NoTransactionsResolved)));

        let missing = SettlementRequest {
            mode: SettlementMode::Pay,
            scope: SettlementScope::Transaction,
            transaction_id: Some(Uuid::new_v4()),
            card: None,
        };
        let result = service(&store).execute("user_1", &missing).await;
        assert!(matches!(result, Err(FinanceError::NoTransactionsResolved)));
    }

    #[tokio::test]
    async fn scope_arguments_are_required() {
        let store = Arc::new(MemoryStore::new());
        let request = SettlementRequest {
            mode: SettlementMode::Pay,
            scope: SettlementScope::Transaction,
            transaction_id: None,
            card: None,
        };
        let result = service(&store).execute("user_1", &request).await;
        assert!(matches!(result, Err(FinanceError::InvalidArgument(_))));

        let request = SettlementRequest {
            scope: SettlementScope::CardStatement,
            ..request
        };
        let result = service(&store).execute("user_1", &request).await;
        assert!(matches!(result, Err(FinanceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn other_users_transactions_are_not_settled() {
        let store = Arc::new(MemoryStore::new());
        let t = transaction(None, date(2026, 2, 6), Some(date(2026, 2, 10)));
        store.add_transaction(t.clone());

        let request = SettlementRequest {
            mode: SettlementMode::Pay,
            scope: SettlementScope::Transaction,
            transaction_id: Some(t.id),
            card: None,
        };
        let result = service(&store).execute("user_2", &request).await;
        assert!(matches!(result, Err(FinanceError::NoTransactionsResolved)));
        assert_eq!(service(&store).execute("user_1", &request).await.unwrap(), 1);
    }
}
