//! HTTP surface of the review service.
//!
//! ## Module Map
//!
//! | Module     | Responsibility                                              |
//! |------------|-------------------------------------------------------------|
//! | `server`   | axum `Router` assembly, `ServerConfig`, lifecycle           |
//! | `handlers` | Route handlers and `AppState`                               |
//! | `body`     | Lenient interpretation of the raw request body              |
//! | `response` | `ApiResponse` / `ApiErrorResponse` envelopes                |
//!
//! ## Request Flow (`POST /api/reviews`)
//!
//! 1. `handlers::create_review` receives the body as raw bytes.
//! 2. `body::interpret` turns the bytes into a validated request, trying a
//!    strict JSON parse, then a control-character sanitization pass, then a
//!    last-resort field extraction before rejecting the body.
//! 3. `ReviewService::generate_review` produces the payload, remote-first
//!    with the heuristic fallback.
//! 4. The result leaves as an `ApiResponse` envelope whose `code` mirrors
//!    the HTTP status; interpretation failures leave as `ApiErrorResponse`.

pub mod body;
pub mod handlers;
pub mod response;
pub mod server;

// Re-export main types
pub use handlers::{AppState, SharedState};
pub use response::{ApiErrorResponse, ApiResponse};
pub use server::{ServerConfig, build_router, start_server};
