use crate::dtos::MonthQuery;
use crate::middleware::UserId;
use crate::services::{CardSpending, CardStatement};
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub async fn get_card_statement(
    State(state): State<AppState>,
    user_id: UserId,
    Path(card_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<CardStatement>, AppError> {
    query.validate()?;

    let statement = state
        .card_statements
        .statement(&user_id.0, card_id, query.month, query.year)
        .await?;
    Ok(Json(statement))
}

pub async fn get_spending_summary(
    State(state): State<AppState>,
    user_id: UserId,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<CardSpending>>, AppError> {
    query.validate()?;

    let summary = state
        .card_statements
        .spending_summary(&user_id.0, query.month, query.year)
        .await?;
    Ok(Json(summary))
}
