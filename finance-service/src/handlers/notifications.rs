use crate::dtos::{NotificationsQuery, UpdatedCount};
use crate::middleware::UserId;
use crate::models::Notification;
use crate::services::DueDateSweep;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_notifications(
    State(state): State<AppState>,
    user_id: UserId,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = state
        .notifications
        .list(&user_id.0, query.unread_only)
        .await?;
    Ok(Json(notifications))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    user_id: UserId,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.notifications.mark_as_read(&user_id.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<Json<UpdatedCount>, AppError> {
    let updated_count = state.notifications.mark_all_as_read(&user_id.0).await?;
    Ok(Json(UpdatedCount { updated_count }))
}

/// Runs the reminder and overdue sweep across all users.
#[tracing::instrument(skip(state, _user_id))]
pub async fn check_due_dates(
    State(state): State<AppState>,
    _user_id: UserId,
) -> Result<Json<DueDateSweep>, AppError> {
    let sweep = state.notifications.check_due_dates(Utc::now()).await?;
    Ok(Json(sweep))
}
