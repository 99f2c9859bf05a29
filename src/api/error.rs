use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::domain::order::OrderError;

/// Every failure an HTTP handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Body, path or query string that could not be decoded.
    #[error("Malformed request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Order(e) if e.is_persistence() => "internal",
            ApiError::Order(e) => e.kind(),
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Order(OrderError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Order(OrderError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Order(OrderError::InsufficientStock { .. }) => StatusCode::CONFLICT,
            ApiError::Order(OrderError::Persistence(_) | OrderError::DeadlineExceeded(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Order(e) if e.is_persistence() => {
                // Store details stay in the log.
                tracing::error!(error = %e, "Responding with internal error");
                json!({"error": {"code": self.code(), "message": "internal server error"}})
            }
            ApiError::Order(OrderError::InsufficientStock {
                variant_id,
                requested,
                available,
            }) => json!({"error": {
                "code": self.code(),
                "message": self.to_string(),
                "variant_id": variant_id,
                "requested": requested,
                "available": available,
            }}),
            _ => {
                tracing::debug!(error = %self, "Responding with client error");
                json!({"error": {"code": self.code(), "message": self.to_string()}})
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
