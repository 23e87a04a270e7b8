//! Review orchestration.
//!
//! Carries one interpreted request end to end: normalize the style, resolve
//! the language, ask the remote reviewer, coerce its answer into typed
//! suggestions. When the remote path fails after its retries, the service
//! answers from the heuristic rules instead and marks the response degraded;
//! callers of [`ReviewService::generate_review`] only ever see an error for
//! pre-review problems, never for a remote outage (unless the fallback is
//! switched off).

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

use crate::api::response::ApiResponse;
use crate::config::RemoteConfig;
use crate::errors::{ApiError, ErrorCode};
use crate::review::client::{RemoteReviewClient, RemoteReviewError};
use crate::review::heuristics::{HEURISTIC_MODEL, HeuristicAnalyzer};
use crate::review::model::{ReviewData, ReviewMetrics, ReviewRequest, ReviewStyle, Suggestion};

const DEFAULT_LANGUAGE: &str = "javascript";

/// Keywords that mark a snippet as TypeScript. Checked before the script
/// signals; the first matching list wins.
const TYPESCRIPT_SIGNALS: [&str; 6] = [
    "interface ",
    "type ",
    ": number",
    ": string",
    "enum ",
    "<T>",
];

/// Keywords that mark a snippet as JavaScript.
const JAVASCRIPT_SIGNALS: [&str; 5] = ["function ", "const ", "let ", "import ", "export "];

/// The remote reviewer as the orchestrator sees it.
///
/// Production uses [`RemoteReviewClient`]; tests substitute a scripted
/// implementation to drive the success and fallback paths deterministically.
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    /// Produce the raw review payload for one request.
    async fn create_review(
        &self,
        request: &ReviewRequest,
        language: &str,
        style: ReviewStyle,
    ) -> Result<Value, RemoteReviewError>;

    /// Identifier reported in metrics when the payload does not name one.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl ReviewBackend for RemoteReviewClient {
    async fn create_review(
        &self,
        request: &ReviewRequest,
        language: &str,
        style: ReviewStyle,
    ) -> Result<Value, RemoteReviewError> {
        RemoteReviewClient::create_review(self, request, language, style).await
    }

    fn model_name(&self) -> &str {
        RemoteReviewClient::model_name(self)
    }
}

/// Orchestrates reviews from interpreted request to response envelope.
pub struct ReviewService {
    backend: Box<dyn ReviewBackend>,
    analyzer: HeuristicAnalyzer,
    fallback_enabled: bool,
}

impl ReviewService {
    /// Build the production service over the HTTP-backed client.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteReviewError> {
        let client = RemoteReviewClient::new(config)?;
        Ok(Self::with_backend(Box::new(client), config.fallback_enabled))
    }

    /// Build a service over an arbitrary backend.
    pub(crate) fn with_backend(backend: Box<dyn ReviewBackend>, fallback_enabled: bool) -> Self {
        Self {
            backend,
            analyzer: HeuristicAnalyzer::new(),
            fallback_enabled,
        }
    }

    /// Review one validated request.
    ///
    /// Returns the success envelope with remote results, or the degraded
    /// envelope with heuristic results when the remote call fails. The only
    /// error path is a remote failure with the fallback disabled.
    pub async fn generate_review(
        &self,
        request: &ReviewRequest,
    ) -> Result<ApiResponse<ReviewData>, ApiError> {
        let started = Instant::now();
        let style = ReviewStyle::resolve(request.style.as_deref());
        let language = resolve_language(request.language.as_deref(), &request.code);

        match self.backend.create_review(request, &language, style).await {
            Ok(payload) => {
                let data = self.remote_data(request, style, &language, &payload, started);
                Ok(ApiResponse::ok(data))
            }
            Err(error) => self.heuristic_fallback(request, style, &language, &error, started),
        }
    }

    /// Assemble the response payload from a remote answer.
    ///
    /// The payload is loose JSON; every field is salvaged individually and
    /// anything unusable falls back to a value computed here.
    fn remote_data(
        &self,
        request: &ReviewRequest,
        style: ReviewStyle,
        language: &str,
        payload: &Value,
        started: Instant,
    ) -> ReviewData {
        let suggestions = coerce_suggestions(payload.get("suggestions"));

        let summary = payload
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| synthesize_summary(style, language, suggestions.len()));

        let metrics = payload.get("metrics");
        let processing_ms = metrics
            .and_then(|m| m.get("processingTimeMs"))
            .and_then(Value::as_u64)
            .unwrap_or_else(|| started.elapsed().as_millis() as u64);
        let model = metrics
            .and_then(|m| m.get("model"))
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.backend.model_name())
            .to_string();

        ReviewData::new(
            request.code.clone(),
            summary,
            suggestions,
            ReviewMetrics::new(processing_ms, model),
        )
    }

    /// Answer a failed remote review from the heuristic rules.
    fn heuristic_fallback(
        &self,
        request: &ReviewRequest,
        style: ReviewStyle,
        language: &str,
        error: &RemoteReviewError,
        started: Instant,
    ) -> Result<ApiResponse<ReviewData>, ApiError> {
        let reason = error.to_string();

        if !self.fallback_enabled {
            warn!(error = %reason, "remote review failed and the fallback is disabled");
            return Err(ApiError::Status {
                code: ErrorCode::ServiceUnavailable,
                detail: Some(reason),
            });
        }

        warn!(
            error = %reason,
            style = %style,
            language,
            "remote review failed, answering with heuristics"
        );

        let suggestions = self.analyzer.analyze(&request.code, style);
        let fallback_summary = synthesize_summary(style, language, suggestions.len());
        let summary = format!(
            "The remote review call failed. Please try again shortly. (reason: {reason}) \
             Returning heuristic results instead. {fallback_summary}"
        );

        let data = ReviewData::new(
            request.code.clone(),
            summary,
            suggestions,
            ReviewMetrics::new(started.elapsed().as_millis() as u64, HEURISTIC_MODEL),
        );
        Ok(ApiResponse::degraded("Remote review call failed", data))
    }
}

/// Pick the language the review runs under.
///
/// An explicit language wins, lower-cased. Otherwise the snippet is scanned
/// against the typed-language signals, then the script signals, defaulting
/// to JavaScript.
fn resolve_language(explicit: Option<&str>, code: &str) -> String {
    if let Some(language) = explicit {
        return language.to_lowercase();
    }

    if TYPESCRIPT_SIGNALS.iter().any(|signal| code.contains(signal)) {
        "typescript".to_string()
    } else if JAVASCRIPT_SIGNALS.iter().any(|signal| code.contains(signal)) {
        "javascript".to_string()
    } else {
        DEFAULT_LANGUAGE.to_string()
    }
}

/// Keys a remote entry must supply itself. The typed model would default
/// them when absent, but only `id` and `status` get fill-ins.
const REQUIRED_ENTRY_KEYS: [&str; 5] = ["tags", "range", "fix", "fixSnippet", "confidence"];

/// Coerce the remote `suggestions` value into typed suggestions.
///
/// Anything that is not an array yields an empty list. Entries that are not
/// objects, lack a required key, fail deserialization, or carry an inverted
/// range are dropped; missing `id` and `status` fields are filled during
/// deserialization.
fn coerce_suggestions(raw: Option<&Value>) -> Vec<Suggestion> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut suggestions = Vec::new();
    for entry in entries {
        let Some(object) = entry.as_object() else {
            continue;
        };
        if let Some(missing) = REQUIRED_ENTRY_KEYS
            .iter()
            .find(|key| object.get(**key).is_none_or(Value::is_null))
        {
            debug!(field = *missing, "dropping remote suggestion missing a required field");
            continue;
        }
        let suggestion: Suggestion = match serde_json::from_value(entry.clone()) {
            Ok(suggestion) => suggestion,
            Err(error) => {
                debug!(error = %error, "dropping malformed remote suggestion");
                continue;
            }
        };
        if suggestion.range.is_some_and(|range| !range.is_ordered()) {
            debug!(title = %suggestion.title, "dropping remote suggestion with inverted range");
            continue;
        }
        suggestions.push(suggestion);
    }
    suggestions
}

/// Summary used when the remote payload has none, and for heuristic results.
fn synthesize_summary(style: ReviewStyle, language: &str, count: usize) -> String {
    let language = language.to_uppercase();
    let label = style.focus_label();
    if count == 0 {
        format!(
            "Reviewed the {language} code from a {label} perspective, \
             but found no immediately applicable improvements."
        )
    } else {
        format!(
            "Reviewed the {language} code from a {label} perspective \
             and generated {count} suggestion(s)."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::model::Severity;
    use serde_json::json;

    const COMPARE_SNIPPET: &str =
        "function compare(a, b) {\n  if (a == b) {\n    console.log('equal');\n  }\n}\n";

    const INTERFACE_SNIPPET: &str = "interface User {\n id: number;\n}\n";

    enum Script {
        Succeed(Value),
        Fail { status: u16, body: String },
    }

    struct ScriptedBackend {
        script: Script,
        model: String,
    }

    impl ScriptedBackend {
        fn succeeding(payload: Value) -> Self {
            Self {
                script: Script::Succeed(payload),
                model: "scripted-model".to_string(),
            }
        }

        fn failing(body: &str) -> Self {
            Self {
                script: Script::Fail {
                    status: 500,
                    body: body.to_string(),
                },
                model: "scripted-model".to_string(),
            }
        }
    }

    #[async_trait]
    impl ReviewBackend for ScriptedBackend {
        async fn create_review(
            &self,
            _request: &ReviewRequest,
            _language: &str,
            _style: ReviewStyle,
        ) -> Result<Value, RemoteReviewError> {
            match &self.script {
                Script::Succeed(payload) => Ok(payload.clone()),
                Script::Fail { status, body } => Err(RemoteReviewError::Http {
                    status: *status,
                    body: body.clone(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }

    fn service(backend: ScriptedBackend) -> ReviewService {
        ReviewService::with_backend(Box::new(backend), true)
    }

    fn request(code: &str, language: Option<&str>, style: Option<&str>) -> ReviewRequest {
        ReviewRequest {
            code: code.to_string(),
            language: language.map(str::to_string),
            style: style.map(str::to_string),
        }
    }

    /// A remote entry carrying every key the schema demands of the model.
    fn full_entry(title: &str) -> Value {
        json!({
            "title": title,
            "rationale": "because",
            "severity": "minor",
            "tags": ["cleanup"],
            "range": { "startLine": 1, "startCol": 1, "endLine": 1, "endCol": 3 },
            "fix": {
                "type": "unified-diff",
                "diff": "--- original\n+++ updated\n@@ -1 +1 @@\n-const a = 1;\n+const b = 2;"
            },
            "fixSnippet": "const b = 2;",
            "confidence": 0.5
        })
    }

    // =========================================
    // Language resolution tests
    // =========================================

    #[test]
    fn test_resolve_language_prefers_explicit_value() {
        assert_eq!(resolve_language(Some("Python"), "function f() {}"), "python");
    }

    #[test]
    fn test_resolve_language_typed_signals_win() {
        assert_eq!(resolve_language(None, INTERFACE_SNIPPET), "typescript");
        // Both lists match; the typed one is checked first.
        assert_eq!(
            resolve_language(None, "interface A {}\nconst x = 1;\n"),
            "typescript"
        );
    }

    #[test]
    fn test_resolve_language_script_signals() {
        assert_eq!(resolve_language(None, "function f() {}"), "javascript");
        assert_eq!(resolve_language(None, "let total = 0;"), "javascript");
    }

    #[test]
    fn test_resolve_language_defaults_to_javascript() {
        assert_eq!(resolve_language(None, "x = 1"), "javascript");
        assert_eq!(resolve_language(None, ""), "javascript");
    }

    // =========================================
    // Summary synthesis tests
    // =========================================

    #[test]
    fn test_synthesize_summary_without_findings() {
        assert_eq!(
            synthesize_summary(ReviewStyle::Detail, "typescript", 0),
            "Reviewed the TYPESCRIPT code from a detail-focused perspective, \
             but found no immediately applicable improvements."
        );
    }

    #[test]
    fn test_synthesize_summary_with_findings() {
        assert_eq!(
            synthesize_summary(ReviewStyle::Bug, "javascript", 2),
            "Reviewed the JAVASCRIPT code from a bug-focused perspective \
             and generated 2 suggestion(s)."
        );
    }

    // =========================================
    // Coercion tests
    // =========================================

    #[test]
    fn test_coerce_non_array_yields_empty() {
        assert!(coerce_suggestions(None).is_empty());
        assert!(coerce_suggestions(Some(&json!("nope"))).is_empty());
        assert!(coerce_suggestions(Some(&json!({"title": "t"}))).is_empty());
    }

    #[test]
    fn test_coerce_fills_id_and_status_defaults() {
        let raw = json!([full_entry("Tighten check")]);
        let coerced = coerce_suggestions(Some(&raw));
        assert_eq!(coerced.len(), 1);
        assert_eq!(coerced[0].status, "pending");
        assert_eq!(coerced[0].id.len(), 36);
    }

    #[test]
    fn test_coerce_drops_entries_missing_required_keys() {
        let mut missing_confidence = full_entry("no confidence");
        missing_confidence.as_object_mut().unwrap().remove("confidence");
        let mut null_range = full_entry("null range");
        null_range["range"] = Value::Null;

        let raw = json!([
            { "title": "bare", "rationale": "because", "severity": "minor" },
            missing_confidence,
            null_range,
            full_entry("keeper")
        ]);
        let coerced = coerce_suggestions(Some(&raw));
        assert_eq!(coerced.len(), 1);
        assert_eq!(coerced[0].title, "keeper");
    }

    #[test]
    fn test_coerce_drops_unusable_entries() {
        let mut missing_title = full_entry("gone");
        missing_title.as_object_mut().unwrap().remove("title");
        let mut inverted = full_entry("inverted range");
        inverted["range"] = json!({ "startLine": 5, "startCol": 1, "endLine": 2, "endCol": 1 });

        let raw = json!([
            42,
            "not an object",
            missing_title,
            inverted,
            full_entry("keeper")
        ]);
        let coerced = coerce_suggestions(Some(&raw));
        assert_eq!(coerced.len(), 1);
        assert_eq!(coerced[0].title, "keeper");
    }

    #[test]
    fn test_coerce_keeps_unknown_severity_as_minor() {
        let mut entry = full_entry("odd label");
        entry["severity"] = json!("blocker");
        let coerced = coerce_suggestions(Some(&json!([entry])));
        assert_eq!(coerced.len(), 1);
        assert_eq!(coerced[0].severity, Severity::Minor);
    }

    // =========================================
    // Remote success tests
    // =========================================

    #[tokio::test]
    async fn test_remote_success_passes_payload_through() {
        let mut entry = full_entry("Rename variable");
        entry["id"] = json!("s-1");
        entry["status"] = json!("pending");
        let payload = json!({
            "summary": "Looks solid overall.",
            "suggestions": [entry],
            "metrics": { "processingTimeMs": 1234, "model": "remote-model-x" }
        });
        let service = service(ScriptedBackend::succeeding(payload));
        let request = request("const a = 1;", Some("javascript"), Some("detail"));

        let response = service.generate_review(&request).await.unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(response.message, "OK");
        assert_eq!(response.data.summary, "Looks solid overall.");
        assert_eq!(response.data.suggestions.len(), 1);
        assert_eq!(response.data.suggestions[0].id, "s-1");
        assert_eq!(response.data.suggestions[0].confidence, Some(0.5));
        assert_eq!(response.data.metrics.processing_time_ms, 1234);
        assert_eq!(response.data.metrics.model, "remote-model-x");
    }

    #[tokio::test]
    async fn test_remote_success_echoes_code_into_both_slots() {
        let service = service(ScriptedBackend::succeeding(json!({ "suggestions": [] })));
        let request = request("const a = 1;\n", None, None);

        let response = service.generate_review(&request).await.unwrap();
        assert_eq!(response.data.original_code, "const a = 1;\n");
        assert_eq!(response.data.current_code, "const a = 1;\n");
    }

    #[tokio::test]
    async fn test_blank_remote_summary_is_synthesized() {
        let payload = json!({ "summary": "   ", "suggestions": [] });
        let service = service(ScriptedBackend::succeeding(payload));
        let request = request(INTERFACE_SNIPPET, None, None);

        let response = service.generate_review(&request).await.unwrap();
        assert!(response.data.suggestions.is_empty());
        assert_eq!(
            response.data.summary,
            "Reviewed the TYPESCRIPT code from a detail-focused perspective, \
             but found no immediately applicable improvements."
        );
    }

    #[tokio::test]
    async fn test_unusable_remote_metrics_are_replaced() {
        let payload = json!({
            "suggestions": [],
            "metrics": { "processingTimeMs": -5, "model": "   " }
        });
        let service = service(ScriptedBackend::succeeding(payload));
        let request = request("const a = 1;", None, None);

        let response = service.generate_review(&request).await.unwrap();
        // Negative time is ignored in favour of the measured wall clock.
        assert!(response.data.metrics.processing_time_ms < 10_000);
        assert_eq!(response.data.metrics.model, "scripted-model");
    }

    #[tokio::test]
    async fn test_session_ids_are_fresh_per_review() {
        let service = service(ScriptedBackend::succeeding(json!({ "suggestions": [] })));
        let request = request("const a = 1;", None, None);

        let first = service.generate_review(&request).await.unwrap();
        let second = service.generate_review(&request).await.unwrap();
        assert_ne!(first.data.session_id, second.data.session_id);
    }

    // =========================================
    // Fallback tests
    // =========================================

    #[tokio::test]
    async fn test_failed_remote_call_answers_with_heuristics() {
        let service = service(ScriptedBackend::failing("upstream melted"));
        let request = request(COMPARE_SNIPPET, None, Some("bug"));

        let response = service.generate_review(&request).await.unwrap();
        assert_eq!(response.code, 503);
        assert_eq!(response.message, "Remote review call failed");
        assert_eq!(response.data.metrics.model, HEURISTIC_MODEL);

        let expected = HeuristicAnalyzer::new().analyze(COMPARE_SNIPPET, ReviewStyle::Bug);
        assert_eq!(response.data.suggestions.len(), expected.len());
        for (got, want) in response.data.suggestions.iter().zip(&expected) {
            assert_eq!(got.title, want.title);
            assert_eq!(got.severity, want.severity);
            assert_eq!(got.confidence, want.confidence);
            assert_eq!(got.range, want.range);
            assert_eq!(got.fix, want.fix);
        }
    }

    #[tokio::test]
    async fn test_degraded_summary_carries_the_failure_reason() {
        let service = service(ScriptedBackend::failing("upstream melted"));
        let request = request(COMPARE_SNIPPET, None, Some("bug"));

        let response = service.generate_review(&request).await.unwrap();
        let summary = &response.data.summary;
        assert!(summary.starts_with("The remote review call failed. Please try again shortly."));
        assert!(summary.contains("upstream melted"));
        assert!(summary.contains("Returning heuristic results instead."));
        assert!(summary.contains(
            "Reviewed the JAVASCRIPT code from a bug-focused perspective \
             and generated 2 suggestion(s)."
        ));
    }

    #[tokio::test]
    async fn test_degraded_scenario_flags_equality_and_logging() {
        let service = service(ScriptedBackend::failing("down"));
        let request = request(COMPARE_SNIPPET, None, Some("bug"));

        let response = service.generate_review(&request).await.unwrap();
        let suggestions = &response.data.suggestions;
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].severity, Severity::Major);
        assert_eq!(suggestions[0].confidence, Some(0.7));
        assert_eq!(suggestions[1].severity, Severity::Minor);
        assert_eq!(suggestions[1].confidence, Some(0.6));
    }

    #[tokio::test]
    async fn test_disabled_fallback_surfaces_the_outage() {
        let backend = ScriptedBackend::failing("upstream melted");
        let service = ReviewService::with_backend(Box::new(backend), false);
        let request = request(COMPARE_SNIPPET, None, Some("bug"));

        let error = service.generate_review(&request).await.unwrap_err();
        match error {
            ApiError::Status { code, detail } => {
                assert_eq!(code, ErrorCode::ServiceUnavailable);
                assert!(detail.unwrap().contains("upstream melted"));
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_style_reviews_as_detail() {
        let service = service(ScriptedBackend::failing("down"));
        let request = request("// TODO\n", None, Some("exhaustive"));

        let response = service.generate_review(&request).await.unwrap();
        // The bare-TODO rule only runs for detail and refactor reviews.
        assert_eq!(response.data.suggestions.len(), 1);
        assert_eq!(response.data.suggestions[0].title, "Describe the TODO");
        assert!(response.data.summary.contains("detail-focused"));
    }
}
