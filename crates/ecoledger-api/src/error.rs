//! Error types for ecoledger-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ecoledger_core::error::{ErrorCode, ErrorDetails};
use ecoledger_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Core(e) => match e.code() {
                ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
                ErrorCode::ValidationError | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
                ErrorCode::RemoteError | ErrorCode::SubscriptionError => StatusCode::BAD_GATEWAY,
                ErrorCode::IoError | ErrorCode::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn details(&self) -> ErrorDetails {
        match self {
            ApiError::BadRequest { .. } => ErrorDetails::new(ErrorCode::ValidationError, self.to_string()),
            ApiError::Core(e) => e.to_details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.details() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
