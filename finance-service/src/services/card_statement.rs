//! Per-card invoice views: a single card's statement and the spending
//! summary across a user's active cards.

use crate::billing::{Period, last_day_of_month, resolve_due_date};
use crate::error::FinanceError;
use crate::models::{CreditCard, Transaction};
use crate::repositories::{CreditCardRepository, TransactionRepository};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatement {
    pub card: CreditCard,
    pub month: u32,
    pub year: i32,
    pub due_date: Option<NaiveDate>,
    pub transactions: Vec<Transaction>,
    pub total_spent: Decimal,
    pub available_limit: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardSpending {
    pub credit_card_id: Uuid,
    pub name: String,
    pub last_four_digits: Option<String>,
    pub brand: Option<String>,
    pub total_spent: Decimal,
    pub transaction_count: usize,
    pub limit: Option<Decimal>,
    pub percentage_used: Option<Decimal>,
}

pub struct CardStatementService {
    cards: Arc<dyn CreditCardRepository>,
    transactions: Arc<dyn TransactionRepository>,
}

impl CardStatementService {
    pub fn new(
        cards: Arc<dyn CreditCardRepository>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            cards,
            transactions,
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id, credit_card_id = %card_id))]
    pub async fn statement(
        &self,
        user_id: &str,
        card_id: Uuid,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<CardStatement, FinanceError> {
        let (month, year) = month_or_current(month, year);

        let card = self
            .cards
            .find_by_id(card_id)
            .await?
            .filter(|card| card.user_id == user_id)
            .ok_or(FinanceError::NotFound("Credit card"))?;

        let transactions = self.invoice_transactions(user_id, &card, month, year).await?;
        let total_spent: Decimal = transactions.iter().map(|t| t.amount).sum();

        Ok(CardStatement {
            due_date: card
                .due_day
                .and_then(|day| invoice_due_date(year, month, day)),
            available_limit: card.limit.map(|limit| limit - total_spent),
            card,
            month,
            year,
            transactions,
            total_spent,
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn spending_summary(
        &self,
        user_id: &str,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<Vec<CardSpending>, FinanceError> {
        let (month, year) = month_or_current(month, year);
        let cards = self.cards.list_active_by_user(user_id).await?;

        let mut summary = Vec::with_capacity(cards.len());
        for card in cards {
            let transactions = self.invoice_transactions(user_id, &card, month, year).await?;
            let total_spent: Decimal = transactions.iter().map(|t| t.amount).sum();

            summary.push(CardSpending {
                credit_card_id: card.id,
                percentage_used: percentage_used(total_spent, card.limit),
                name: card.name,
                last_four_digits: card.last_four_digits,
                brand: card.brand,
                total_spent,
                transaction_count: transactions.len(),
                limit: card.limit,
            });
        }

        summary.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
        Ok(summary)
    }

    /// The card's transactions whose resolved due date falls in the month.
    async fn invoice_transactions(
        &self,
        user_id: &str,
        card: &CreditCard,
        month: u32,
        year: i32,
    ) -> Result<Vec<Transaction>, FinanceError> {
        let period = Period::new(Some(month), Some(year));
        let schedule = card.schedule();
        let transactions = self
            .transactions
            .list_by_credit_card(user_id, card.id)
            .await?
            .into_iter()
            .filter(|t| {
                resolve_due_date(t.due_date, t.date, Some(&schedule))
                    .is_some_and(|due| period.contains(due))
            })
            .collect();
        Ok(transactions)
    }
}

fn month_or_current(month: Option<u32>, year: Option<i32>) -> (u32, i32) {
    let today = Utc::now().date_naive();
    (
        month.unwrap_or_else(|| today.month()),
        year.unwrap_or_else(|| today.year()),
    )
}

fn invoice_due_date(year: i32, month: u32, due_day: u32) -> Option<NaiveDate> {
    let day = due_day.clamp(1, last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

fn percentage_used(total_spent: Decimal, limit: Option<Decimal>) -> Option<Decimal> {
    let limit = limit.filter(|l| *l > Decimal::ZERO)?;
    Some((total_spent / limit * Decimal::ONE_HUNDRED).round_dp(2))
}
