//! The review pipeline, remote-first with a deterministic safety net.
//!
//! A request flows through style normalization and language resolution into
//! the remote reviewer; when that call fails after its retries, the heuristic
//! rules produce the answer instead and the response is marked degraded. The
//! guiding rule is that a review request always comes back with usable
//! suggestions.
//!
//! ## Components
//!
//! - [`model`]: Request, suggestion and response data types
//! - [`prompts`]: Prompt construction for the remote reviewer
//! - [`client`]: HTTP client for the remote messages API
//! - [`heuristics`]: Deterministic fallback review rules
//! - [`service`]: Orchestration from interpreted request to envelope
//!
//! ## Example
//!
//! ```
//! use reviewd::review::{HeuristicAnalyzer, ReviewStyle};
//!
//! // The fallback rules answer without any remote dependency.
//! let analyzer = HeuristicAnalyzer::new();
//! let suggestions = analyzer.analyze("if (a == b) { console.log(a); }", ReviewStyle::Bug);
//! assert_eq!(suggestions.len(), 2);
//!
//! // Unknown styles never fail; they review as `detail`.
//! assert_eq!(ReviewStyle::resolve(Some("thorough")), ReviewStyle::Detail);
//! ```

pub mod client;
pub mod heuristics;
pub mod model;
pub mod prompts;
pub mod service;

// Re-export main types
pub use client::{RemoteReviewClient, RemoteReviewError};
pub use heuristics::{HEURISTIC_MODEL, HeuristicAnalyzer};
pub use model::{
    ReviewData, ReviewMetrics, ReviewRequest, ReviewStyle, Severity, Suggestion, SuggestionFix,
    SuggestionRange,
};
pub use service::{ReviewBackend, ReviewService};
