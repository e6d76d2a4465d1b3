use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use redishort_redirector::RedirectorError;
use redishort_shortener::ShortenerError;
use thiserror::Error;
use tracing::warn;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("short code not found")]
    NotFound,
    #[error("{0}")]
    InvalidUrl(String),
    #[error("short code collision: {0}")]
    CodeCollision(String),
    #[error("link store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            AppError::CodeCollision(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<RedirectorError> for AppError {
    fn from(error: RedirectorError) -> Self {
        match error {
            RedirectorError::StoreUnavailable(source) => {
                AppError::StoreUnavailable(source.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidUrl(rejection.body_text())
    }
}

impl From<ShortenerError> for AppError {
    fn from(error: ShortenerError) -> Self {
        match error {
            ShortenerError::InvalidUrl(reason) => AppError::InvalidUrl(reason),
            ShortenerError::CodeCollision(code) => AppError::CodeCollision(code),
            ShortenerError::Storage(source) => AppError::StoreUnavailable(source.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
