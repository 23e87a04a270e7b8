//! Wire types for the review API.
//!
//! Everything the service accepts and returns lives here: the inbound
//! [`ReviewRequest`], the outbound [`ReviewData`] payload, and the
//! [`Suggestion`] records inside it. Field names on the wire are camelCase.
//!
//! ## Types
//!
//! - [`ReviewRequest`]: validated inbound request (code, language, style)
//! - [`ReviewStyle`]: the four review perspectives
//! - [`Severity`]: closed severity scale for suggestions
//! - [`Suggestion`]: a single review suggestion with optional location and fix
//! - [`SuggestionRange`]: 1-indexed source location span
//! - [`SuggestionFix`]: unified-diff fix attached to a suggestion
//! - [`ReviewData`]: the complete review payload
//! - [`ReviewMetrics`]: timing and model identification
//!
//! ## Example
//!
//! ```
//! use reviewd::review::model::{Severity, Suggestion, SuggestionRange};
//!
//! let suggestion = Suggestion::new(
//!     "Strengthen equality operator",
//!     "`==` coerces operand types; strict comparison avoids surprises",
//!     Severity::Major,
//! )
//! .with_tags(["bug", "best-practice"])
//! .with_range(SuggestionRange::new(3, 5, 3, 7));
//!
//! assert_eq!(suggestion.status, "pending");
//! assert!(!suggestion.id.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A validated review request.
///
/// `language` and `style` are kept as the caller sent them (trimmed); the
/// orchestrator resolves both before the review runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Source code to review. Non-empty after trimming.
    pub code: String,
    /// Declared language, if the caller sent one.
    pub language: Option<String>,
    /// Requested review style, if the caller sent one.
    pub style: Option<String>,
}

/// The review perspective applied to a request.
///
/// Unknown or absent styles resolve to [`ReviewStyle::Detail`] so a request
/// never fails on this field alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStyle {
    /// Hunt for defects and incorrect behavior.
    Bug,
    /// Thorough line-level inspection.
    #[default]
    Detail,
    /// Structural and readability improvements.
    Refactor,
    /// Test coverage and testability.
    Test,
}

impl ReviewStyle {
    /// Resolve a caller-supplied style string.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace;
    /// anything unrecognized falls back to `Detail`.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewd::review::model::ReviewStyle;
    ///
    /// assert_eq!(ReviewStyle::resolve(Some("BUG")), ReviewStyle::Bug);
    /// assert_eq!(ReviewStyle::resolve(Some(" refactor ")), ReviewStyle::Refactor);
    /// assert_eq!(ReviewStyle::resolve(Some("rigorous")), ReviewStyle::Detail);
    /// assert_eq!(ReviewStyle::resolve(None), ReviewStyle::Detail);
    /// ```
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("bug") => Self::Bug,
            Some("detail") => Self::Detail,
            Some("refactor") => Self::Refactor,
            Some("test") => Self::Test,
            _ => Self::Detail,
        }
    }

    /// Wire name of this style.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Detail => "detail",
            Self::Refactor => "refactor",
            Self::Test => "test",
        }
    }

    /// Human label used in summary sentences.
    pub fn focus_label(&self) -> &'static str {
        match self {
            Self::Bug => "bug-focused",
            Self::Detail => "detail-focused",
            Self::Refactor => "refactoring-focused",
            Self::Test => "test-focused",
        }
    }
}

impl fmt::Display for ReviewStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity scale for suggestions, from least to most severe.
///
/// Incoming values resolve case-insensitively; anything outside the scale
/// deserializes as `minor` so one odd label does not cost the suggestion.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    /// Observation with no action required.
    Info,
    /// Worth fixing, low risk if left alone.
    #[default]
    Minor,
    /// Should be fixed before shipping.
    Major,
    /// Likely defect or serious risk.
    Critical,
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" => Self::Info,
            "minor" => Self::Minor,
            "major" => Self::Major,
            "critical" => Self::Critical,
            _ => Self::Minor,
        }
    }
}

impl Severity {
    /// Wire name of this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }

    /// Check whether this severity marks a probable defect.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewd::review::model::Severity;
    ///
    /// assert!(Severity::Major.is_actionable());
    /// assert!(!Severity::Info.is_actionable());
    /// ```
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Major | Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A 1-indexed span in the reviewed source.
///
/// Both endpoints are inclusive. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SuggestionRange {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Check the span ordering: the end never precedes the start.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewd::review::model::SuggestionRange;
    ///
    /// assert!(SuggestionRange::new(3, 5, 3, 7).is_ordered());
    /// assert!(SuggestionRange::new(3, 5, 2, 1).is_ordered() == false);
    /// assert!(SuggestionRange::new(3, 7, 3, 5).is_ordered() == false);
    /// ```
    pub fn is_ordered(&self) -> bool {
        self.start_line < self.end_line
            || (self.start_line == self.end_line && self.start_col <= self.end_col)
    }
}

/// Format of a [`SuggestionFix`] payload. Only unified diffs exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixType {
    #[default]
    #[serde(rename = "unified-diff")]
    UnifiedDiff,
}

/// A concrete fix expressed as a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionFix {
    #[serde(rename = "type", default)]
    pub fix_type: FixType,
    /// Unified diff with `--- original` / `+++ updated` headers.
    pub diff: String,
}

impl SuggestionFix {
    pub fn new(diff: impl Into<String>) -> Self {
        Self {
            fix_type: FixType::UnifiedDiff,
            diff: diff.into(),
        }
    }
}

/// A single review suggestion.
///
/// `id` and `status` always carry values: deserializing a suggestion without
/// them fills in a fresh UUID and `"pending"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default = "fresh_id")]
    pub id: String,
    /// Short imperative headline.
    pub title: String,
    /// Why the change matters.
    pub rationale: String,
    pub severity: Severity,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Location of the issue, when one can be pinpointed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SuggestionRange>,
    /// Machine-applicable fix, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<SuggestionFix>,
    /// The replacement text on its own, for display next to the diff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_snippet: Option<String>,
    /// Reviewer confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Workflow state owned by the caller. Starts as `"pending"`.
    #[serde(default = "pending_status")]
    pub status: String,
}

impl Suggestion {
    /// Create a suggestion with a fresh id and `pending` status.
    pub fn new(title: impl Into<String>, rationale: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: fresh_id(),
            title: title.into(),
            rationale: rationale.into(),
            severity,
            tags: Vec::new(),
            range: None,
            fix: None,
            fix_snippet: None,
            confidence: None,
            status: pending_status(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, range: SuggestionRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_fix(mut self, fix: SuggestionFix) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn with_fix_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.fix_snippet = Some(snippet.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

fn pending_status() -> String {
    "pending".to_string()
}

/// Timing and provenance for one review run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMetrics {
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Identifier of the engine that produced the suggestions.
    pub model: String,
}

impl ReviewMetrics {
    pub fn new(processing_time_ms: u64, model: impl Into<String>) -> Self {
        Self {
            processing_time_ms,
            model: model.into(),
        }
    }
}

/// The complete payload for one review.
///
/// `original_code` and `current_code` both start as the submitted code;
/// `current_code` is the caller's slot for tracking applied fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewData {
    pub session_id: String,
    pub original_code: String,
    pub current_code: String,
    pub summary: String,
    pub suggestions: Vec<Suggestion>,
    pub metrics: ReviewMetrics,
}

impl ReviewData {
    /// Create a payload for a freshly reviewed snippet.
    ///
    /// Generates the session id and mirrors the code into both code slots.
    pub fn new(
        code: impl Into<String>,
        summary: impl Into<String>,
        suggestions: Vec<Suggestion>,
        metrics: ReviewMetrics,
    ) -> Self {
        let code = code.into();
        Self {
            session_id: Uuid::new_v4().to_string(),
            original_code: code.clone(),
            current_code: code,
            summary: summary.into(),
            suggestions,
            metrics,
        }
    }
}
