use crate::dtos::{PayablesQuery, SettleRequest, UpdatedCount};
use crate::middleware::UserId;
use crate::services::{PayablesReport, SettlementRequest};
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, user_id))]
pub async fn get_payables(
    State(state): State<AppState>,
    user_id: UserId,
    Query(query): Query<PayablesQuery>,
) -> Result<Json<PayablesReport>, AppError> {
    query.validate()?;

    let report = state.payables.execute(&user_id.0, query.into()).await?;
    Ok(Json(report))
}

#[tracing::instrument(skip(state, user_id, body))]
pub async fn settle(
    State(state): State<AppState>,
    user_id: UserId,
    Json(body): Json<SettleRequest>,
) -> Result<Json<UpdatedCount>, AppError> {
    let request = SettlementRequest::try_from(body)?;

    let updated_count = state.settlement.execute(&user_id.0, &request).await?;
    Ok(Json(UpdatedCount { updated_count }))
}
