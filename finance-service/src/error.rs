//! Domain error taxonomy for finance-service.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("Unsupported file type")]
    UnsupportedFormat,

    #[error("Invalid user")]
    InvalidUser,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Incomplete transaction: missing {}", .0.join(", "))]
    IncompleteTransaction(Vec<&'static str>),

    #[error("Incomplete classification: missing {}", .0.join(", "))]
    IncompleteClassification(Vec<&'static str>),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("No transactions found to settle")]
    NoTransactionsResolved,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<FinanceError> for AppError {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::Storage(inner) => inner,
            FinanceError::NotFound(_) => AppError::not_found(err.to_string()),
            FinanceError::UnsupportedFormat
            | FinanceError::InvalidUser
            | FinanceError::UserNotFound(_)
            | FinanceError::IncompleteTransaction(_)
            | FinanceError::IncompleteClassification(_)
            | FinanceError::InvalidArgument(_)
            | FinanceError::NoTransactionsResolved => AppError::bad_request(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        let cases = [
            (FinanceError::UnsupportedFormat, StatusCode::BAD_REQUEST),
            (FinanceError::NoTransactionsResolved, StatusCode::BAD_REQUEST),
            (FinanceError::NotFound("Import job"), StatusCode::NOT_FOUND),
            (
                FinanceError::Storage(AppError::ServiceUnavailable),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn lists_missing_fields() {
        let err = FinanceError::IncompleteTransaction(vec!["name", "date"]);
        assert_eq!(err.to_string(), "Incomplete transaction: missing name, date");
    }
}
