use crate::billing::Period;
use crate::models::{PaymentStatus, SettlementMode, SettlementScope, parse_calendar_date};
use crate::repositories::TransactionFilter;
use crate::services::{CardSettlementTarget, SettlementRequest};
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PayablesQuery {
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
    #[validate(range(min = 1970, max = 9999))]
    pub year: Option<i32>,
    pub status: Option<PaymentStatus>,
}

impl From<PayablesQuery> for TransactionFilter {
    fn from(query: PayablesQuery) -> Self {
        TransactionFilter {
            period: Period::new(query.month, query.year),
            status: query.status,
        }
    }
}

/// Invoice month selector for card endpoints; unset parts default to now.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct MonthQuery {
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
    #[validate(range(min = 1970, max = 9999))]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTargetBody {
    pub credit_card_id: Uuid,
    pub due_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub mode: SettlementMode,
    pub scope: SettlementScope,
    pub transaction_id: Option<Uuid>,
    pub card: Option<CardTargetBody>,
}

impl TryFrom<SettleRequest> for SettlementRequest {
    type Error = AppError;

    fn try_from(body: SettleRequest) -> Result<Self, Self::Error> {
        let card = body
            .card
            .map(|card| {
                parse_calendar_date(&card.due_date)
                    .map(|due_date| CardSettlementTarget {
                        credit_card_id: card.credit_card_id,
                        due_date,
                    })
                    .ok_or_else(|| {
                        AppError::bad_request(format!("Invalid card due date: {}", card.due_date))
                    })
            })
            .transpose()?;

        Ok(SettlementRequest {
            mode: body.mode,
            scope: body.scope,
            transaction_id: body.transaction_id,
            card,
        })
    }
}
