//! API error types and JSON error response formatting.
//!
//! Every error body carries `error` (a short summary safe to show a user)
//! and `message` (the detail). Upstream failures never leak the upstream
//! reply or the API key; the detail is logged instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - a required field is missing or empty.
    BadRequest(String),
    /// 429 Too Many Requests - rate limit exceeded.
    TooManyRequests,
    /// 500 Internal Server Error - the upstream call failed.
    Upstream {
        summary: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) => ErrorBody {
                error: msg,
                message: "bad_request".to_string(),
            },
            ApiError::TooManyRequests => ErrorBody {
                error: "Too many requests from this IP, please try again later.".to_string(),
                message: "too_many_requests".to_string(),
            },
            ApiError::Upstream { summary, detail } => {
                tracing::error!(detail = %detail, "{}", summary);
                ErrorBody {
                    error: summary.to_string(),
                    message: "upstream_error".to_string(),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
