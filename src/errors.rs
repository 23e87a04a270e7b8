//! Error codes and the API error taxonomy.
//!
//! Two layers cover the HTTP surface:
//! - `ErrorCode` — the closed table of wire-level codes, each carrying its
//!   HTTP status, status label and default message
//! - `ApiError` — what handlers actually return; every variant renders to
//!   the unified error envelope via `IntoResponse`

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::api::response::ApiErrorResponse;

/// Wire-level error codes.
///
/// The set is closed: request faults share the 400 family, platform faults
/// map onto the named 4xx/5xx entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MissingArgument,
    InvalidArgument,
    BadRequest,
    Forbidden,
    NotFound,
    TooManyRequests,
    ServiceUnavailable,
    ProcessingError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingArgument | Self::InvalidArgument | Self::BadRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProcessingError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// HTTP status name used in the `status` envelope field.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingArgument | Self::InvalidArgument | Self::BadRequest => "BAD_REQUEST",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::ProcessingError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Default human-readable message for the code.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingArgument => "A required value is missing.",
            Self::InvalidArgument => {
                "A required value is missing or the request format is invalid."
            }
            Self::BadRequest => "The request could not be processed.",
            Self::Forbidden => "The requested operation cannot be performed.",
            Self::NotFound => "The requested resource could not be found.",
            Self::TooManyRequests => "Please try again in a moment.",
            Self::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again shortly."
            }
            Self::ProcessingError => "A problem occurred while processing the request.",
        }
    }

    /// Classify a bare HTTP status into a code.
    ///
    /// Named statuses map to their entries, remaining 5xx to
    /// `ProcessingError`, everything else to `BadRequest`.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Self::TooManyRequests,
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable,
            s if s.is_server_error() => Self::ProcessingError,
            _ => Self::BadRequest,
        }
    }
}

/// One field-level problem inside an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors a request handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required value was absent entirely.
    #[error("{}", ErrorCode::MissingArgument.message())]
    MissingArgument { field: String },

    /// The body defeated every interpretation strategy.
    #[error("The request body could not be interpreted as JSON.")]
    MalformedBody {
        #[source]
        cause: anyhow::Error,
    },

    /// The body parsed but one or more fields failed validation.
    #[error("{}", ErrorCode::InvalidArgument.message())]
    Validation { errors: Vec<FieldError> },

    /// An internal failure with no better classification.
    #[error("{}", ErrorCode::ProcessingError.message())]
    Unexpected { message: String },

    /// A fault mapped straight from an HTTP status.
    #[error("{}", .code.message())]
    Status {
        code: ErrorCode,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn from_status(status: StatusCode) -> Self {
        Self::Status {
            code: ErrorCode::from_status(status),
            detail: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message, errors) = match self {
            ApiError::MissingArgument { field } => {
                let code = ErrorCode::MissingArgument;
                let errors = vec![FieldError::new(field, code.message())];
                (code, None, errors)
            }
            ApiError::MalformedBody { .. } => {
                let code = ErrorCode::InvalidArgument;
                let errors = vec![FieldError::new("body", code.message())];
                (
                    code,
                    Some("The request body could not be interpreted as JSON.".to_string()),
                    errors,
                )
            }
            ApiError::Validation { errors } => (ErrorCode::InvalidArgument, None, errors),
            ApiError::Unexpected { message } => {
                let code = ErrorCode::ProcessingError;
                let errors = vec![FieldError::new("general", message)];
                (code, None, errors)
            }
            ApiError::Status { code, detail } => {
                let errors = detail
                    .map(|d| vec![FieldError::new("general", d)])
                    .unwrap_or_default();
                (code, None, errors)
            }
        };

        let body = ApiErrorResponse::from_error_code(code, message, errors);
        (code.status(), Json(body)).into_response()
    }
}
