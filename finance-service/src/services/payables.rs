//! Payables/receivables projection over persisted transactions.
//!
//! Plain payables are split into fixed and variable items. Card-linked
//! payables are grouped into one statement per card and invoice month.

use crate::billing::{effective_status, group_status, resolve_due_date};
use crate::error::FinanceError;
use crate::models::{
    BillableTransaction, EffectiveStatus, PaymentStatus, TransactionCategory, TransactionType,
};
use crate::repositories::{TransactionFilter, TransactionRepository};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub const DEFAULT_CARD_LABEL: &str = "Cartão";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub payment_status: PaymentStatus,
    pub effective_status: EffectiveStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub category: TransactionCategory,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardStatementItem {
    pub credit_card_id: Uuid,
    pub card_name: String,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub effective_status: EffectiveStatus,
    pub transaction_ids: Vec<Uuid>,
    pub item_count: usize,
}

/// `pending` covers everything not yet settled, so overdue amounts are
/// counted in both `pending` and `overdue`.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct Totals {
    pub total: Decimal,
    pub pending: Decimal,
    pub paid: Decimal,
    pub overdue: Decimal,
}

impl Totals {
    fn add(&mut self, amount: Decimal, status: EffectiveStatus) {
        self.total += amount;
        match status {
            EffectiveStatus::Paid => self.paid += amount,
            EffectiveStatus::Overdue => {
                self.overdue += amount;
                self.pending += amount;
            }
            EffectiveStatus::Pending => self.pending += amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PayablesSection {
    pub fixed: Vec<TransactionItem>,
    pub variable: Vec<TransactionItem>,
    pub card_statements: Vec<CardStatementItem>,
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReceivablesSection {
    pub items: Vec<TransactionItem>,
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub net_projection: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PayablesReport {
    pub payables: PayablesSection,
    pub receivables: ReceivablesSection,
    pub summary: ProjectionSummary,
}

pub struct PayablesService {
    transactions: Arc<dyn TransactionRepository>,
}

impl PayablesService {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub async fn execute(
        &self,
        user_id: &str,
        filter: TransactionFilter,
    ) -> Result<PayablesReport, FinanceError> {
        self.execute_at(user_id, filter, Utc::now().date_naive())
            .await
    }

    /// `today` is fixed for the whole report.
    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn execute_at(
        &self,
        user_id: &str,
        filter: TransactionFilter,
        today: NaiveDate,
    ) -> Result<PayablesReport, FinanceError> {
        let (payables, receivables) = tokio::try_join!(
            self.transactions
                .find_billable(user_id, TransactionType::Expense, &filter),
            self.transactions
                .find_billable(user_id, TransactionType::Deposit, &filter),
        )?;

        let (card_rows, plain_rows): (Vec<_>, Vec<_>) = payables
            .into_iter()
            .partition(|row| row.transaction.credit_card_id.is_some());

        let plain: Vec<TransactionItem> = plain_rows
            .iter()
            .map(|row| to_item(row, today))
            .collect();

        let card_statements: Vec<CardStatementItem> = group_card_statements(&card_rows, today)
            .into_iter()
            .filter(|statement| filter.period.contains(statement.due_date))
            .collect();

        let mut payables_totals = Totals::default();
        for item in &plain {
            payables_totals.add(item.amount, item.effective_status);
        }
        for statement in &card_statements {
            payables_totals.add(statement.total_amount, statement.effective_status);
        }

        let items: Vec<TransactionItem> = receivables
            .iter()
            .map(|row| to_item(row, today))
            .collect();
        let mut receivables_totals = Totals::default();
        for item in &items {
            receivables_totals.add(item.amount, item.effective_status);
        }

        let (fixed, variable) = plain.into_iter().partition(|item| item.is_recurring);

        tracing::debug!(
            statements = card_statements.len(),
            receivables = items.len(),
            "Payables report computed"
        );

        Ok(PayablesReport {
            payables: PayablesSection {
                fixed,
                variable,
                card_statements,
                totals: payables_totals,
            },
            summary: ProjectionSummary {
                net_projection: receivables_totals.pending - payables_totals.pending,
            },
            receivables: ReceivablesSection {
                items,
                totals: receivables_totals,
            },
        })
    }
}

fn to_item(row: &BillableTransaction, today: NaiveDate) -> TransactionItem {
    let t = &row.transaction;
    let due_date = t.due_date.unwrap_or(t.date);
    TransactionItem {
        id: t.id,
        name: t.name.clone(),
        description: t.description.clone(),
        amount: t.amount,
        due_date,
        payment_status: t.payment_status,
        effective_status: effective_status(t.payment_status, due_date, today),
        paid_at: t.paid_at,
        is_recurring: t.is_recurring,
        category: t.category,
    }
}

struct StatementGroup {
    credit_card_id: Uuid,
    card_name: String,
    due_date: NaiveDate,
    total_amount: Decimal,
    transaction_ids: Vec<Uuid>,
    statuses: Vec<PaymentStatus>,
}

/// Groups by (card, invoice year, invoice month) in first-seen order.
/// Rows whose due date cannot be resolved are left out.
pub fn group_card_statements(
    rows: &[BillableTransaction],
    today: NaiveDate,
) -> Vec<CardStatementItem> {
    let mut groups: Vec<StatementGroup> = Vec::new();
    let mut index: HashMap<(Uuid, i32, u32), usize> = HashMap::new();

    for row in rows {
        let t = &row.transaction;
        let Some(card_id) = t.credit_card_id else {
            continue;
        };
        let Some(due_date) = resolve_due_date(t.due_date, t.date, row.card.as_ref()) else {
            continue;
        };

        let key = (card_id, due_date.year(), due_date.month());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(StatementGroup {
                credit_card_id: card_id,
                card_name: row
                    .card
                    .as_ref()
                    .and_then(|c| c.name.clone())
                    .unwrap_or_else(|| DEFAULT_CARD_LABEL.to_string()),
                due_date,
                total_amount: Decimal::ZERO,
                transaction_ids: Vec::new(),
                statuses: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.total_amount += t.amount;
        group.transaction_ids.push(t.id);
        group.statuses.push(t.payment_status);
    }

    groups
        .into_iter()
        .map(|group| CardStatementItem {
            effective_status: group_status(group.statuses, group.due_date, today),
            item_count: group.transaction_ids.len(),
            credit_card_id: group.credit_card_id,
            card_name: group.card_name,
            due_date: group.due_date,
            total_amount: group.total_amount,
            transaction_ids: group.transaction_ids,
        })
        .collect()
}
