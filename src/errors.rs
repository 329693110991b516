use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::notification::NotificationError;
use crate::storage::StorageError;
use crate::validation::FieldErrors;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", .0.summary())]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Multipart(err) => err.status(),
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Storage(_) | Self::Notification(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Self::Validation(errors) => json!({
                "success": false,
                "message": errors.summary(),
                "errors": errors,
            }),
            Self::BadRequest(_) | Self::Multipart(_) | Self::Unauthenticated => json!({
                "success": false,
                "message": self.to_string(),
            }),
            Self::Database(_) | Self::Storage(_) | Self::Notification(_) => {
                tracing::error!(error = %self, "request failed");
                json!({
                    "success": false,
                    "message": "Server Error",
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
