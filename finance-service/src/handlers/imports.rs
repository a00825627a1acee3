use crate::dtos::{ImportJobResponse, ImportResponse};
use crate::middleware::UserId;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use service_core::error::AppError;
use uuid::Uuid;

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large".to_string())
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    }
}

/// Multipart upload with a `file` part and an optional `creditCardId` part.
#[tracing::instrument(skip(state, user_id, multipart))]
pub async fn upload_statement(
    State(state): State<AppState>,
    user_id: UserId,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut content: Option<Vec<u8>> = None;
    let mut credit_card_id: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                content = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            Some("creditCardId") => {
                let raw = field.text().await.map_err(multipart_error)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let id = Uuid::parse_str(raw).map_err(|_| {
                        AppError::bad_request(format!("Invalid creditCardId: {}", raw))
                    })?;
                    credit_card_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| AppError::bad_request("No file uploaded"))?;

    let job = state
        .imports
        .start_import(&user_id.0, &content, credit_card_id)
        .await?;

    tracing::info!(
        job_id = %job.id,
        total = job.total,
        "Import accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(ImportResponse::accepted(job))))
}

pub async fn get_import_job(
    State(state): State<AppState>,
    user_id: UserId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ImportJobResponse>, AppError> {
    let job = state.imports.get_job(&user_id.0, job_id).await?;
    Ok(Json(job.into()))
}
