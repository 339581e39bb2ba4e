use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the invoicing API.
///
/// Every variant maps to a stable wire code; store-layer failures are wrapped
/// in `DatabaseError` after the surrounding transaction has been rolled back.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields {
        fields: Vec<String>,
        detail: Option<String>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Fields absent from the payload, with no further diagnosis.
    pub fn missing_fields(fields: Vec<String>) -> Self {
        AppError::MissingFields {
            fields,
            detail: None,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            fields: Option<Vec<String>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            detail: Option<String>,
        }

        let (status, code, fields, detail) = match self {
            AppError::MissingFields { fields, detail } => {
                (StatusCode::BAD_REQUEST, "missing_fields", Some(fields), detail)
            }
            AppError::InvalidArgument(err) => (
                StatusCode::BAD_REQUEST,
                "invalid_id",
                None,
                Some(err.to_string()),
            ),
            AppError::NotFound(err) => (
                StatusCode::NOT_FOUND,
                "not_found",
                None,
                Some(err.to_string()),
            ),
            AppError::NoFieldsToUpdate => {
                (StatusCode::BAD_REQUEST, "no_fields_to_update", None, None)
            }
            AppError::DatabaseError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                None,
                Some(err.to_string()),
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                None,
                Some(err.to_string()),
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                Some(format!("{:#}", err)),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: code,
                fields,
                detail,
            }),
        )
            .into_response()
    }
}
