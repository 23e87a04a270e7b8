//! Response envelopes shared by every handler.
//!
//! Success and degraded results share one shape: `{code, message, data}`,
//! where `code` mirrors the HTTP status actually sent. Errors use
//! `{status, code, message, errors}` with at least one field-level entry.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::errors::{ErrorCode, FieldError};

/// Envelope for answered reviews, healthy or degraded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "OK".to_string(),
            data,
        }
    }

    /// Degraded-but-answered: the payload is served with a 503 marker.
    pub fn degraded(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 503,
            message: message.into(),
            data,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.http_status(), Json(self)).into_response()
    }
}

/// Envelope for rejected requests and platform faults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiErrorResponse {
    pub status: &'static str,
    pub code: u16,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ApiErrorResponse {
    /// Fill the envelope from a code.
    ///
    /// `message` overrides the code's default; an empty error list collapses
    /// to a single `general` entry so `errors` is never empty on the wire.
    pub fn from_error_code(
        code: ErrorCode,
        message: Option<String>,
        errors: Vec<FieldError>,
    ) -> Self {
        let message = message.unwrap_or_else(|| code.message().to_string());
        let errors = if errors.is_empty() {
            vec![FieldError::new("general", message.clone())]
        } else {
            errors
        };
        Self {
            status: code.label(),
            code: code.status().as_u16(),
            message,
            errors,
        }
    }
}
