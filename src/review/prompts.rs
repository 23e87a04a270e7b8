//! Prompt text for the remote reviewer.
//!
//! The instruction block pins the exact response schema the service knows
//! how to coerce. Treat it as part of the wire contract: loosening a line
//! here changes what comes back from the model.

use serde_json::json;

use crate::review::model::ReviewStyle;

/// Schema instructions prepended to every review prompt.
pub const REVIEW_PROMPT_INSTRUCTIONS: &str = r#"You are a code review assistant that returns structured JSON responses.

Your response must strictly follow this schema:

{
  "sessionId": string,
  "originalCode": string,
  "currentCode": string,
  "summary": string,
  "suggestions": [
    {
      "id": string,
      "title": string,
      "rationale": string,
      "severity": "info" | "minor" | "major" | "critical",
      "tags": string[],
      "range": {
        "startLine": number,
        "startCol": number,
        "endLine": number,
        "endCol": number
      },
      "fix": {
        "type": "unified-diff",
        "diff": string
      },
      "fixSnippet": string,
      "confidence": number,
      "status": "pending"
    }
  ],
  "metrics": {
    "processingTimeMs": number,
    "model": string
  }
}

Notes:
- Use the exact field names and types above.
- `suggestions` must be a flat array of suggestion objects.
- All suggestion objects must include a unique `id`, a `rationale`, and a `range`.
- If any value is missing, return a default: empty string (`""`) or empty array (`[]`) or `null`, but do not omit the field.
- `status` is always `"pending"` by default.
- Set `confidence` to a float between 0.0 and 1.0, e.g. `0.85`.
- `fix.type` must always be `"unified-diff"` even if diff is empty.
- Include all fields even if the suggestion is minimal.
- Your output must be a **valid JSON object**, without commentary or explanation.

Do not wrap the JSON in Markdown or any prose."#;

/// System prompt sent with every review request.
pub const SYSTEM_PROMPT: &str = "You are CodeReviewAgent. Review the supplied code in the \
     requested style and language. Follow all schema requirements exactly and respond with \
     valid JSON only.";

/// Assemble the user prompt for one review.
///
/// `code` is the (possibly clipped) snippet sent to the model;
/// `declared_language` is what the caller sent, `resolved_language` what the
/// service settled on. Both appear in the context snapshot so the model can
/// see the difference.
pub fn build_user_prompt(
    code: &str,
    declared_language: Option<&str>,
    resolved_language: &str,
    style: ReviewStyle,
) -> String {
    let snapshot = json!({
        "code": code,
        "language": declared_language,
        "resolvedLanguage": resolved_language,
        "style": style.as_str(),
    });
    // Serializing a json! literal cannot fail.
    let snapshot = serde_json::to_string_pretty(&snapshot).unwrap_or_default();

    let fence_tag = if resolved_language.is_empty() {
        "text"
    } else {
        resolved_language
    };

    [
        REVIEW_PROMPT_INSTRUCTIONS,
        "",
        "Review request context:",
        &snapshot,
        "Code snippet:",
        &format!("```{fence_tag}\n{code}\n```"),
    ]
    .join("\n")
}

/// Bound the prompt-side code text to `max_chars` characters.
///
/// The cut lands on a char boundary; `None` returns the snippet whole.
pub fn clip_code(code: &str, max_chars: Option<usize>) -> &str {
    match max_chars {
        Some(max) => match code.char_indices().nth(max) {
            Some((idx, _)) => &code[..idx],
            None => code,
        },
        None => code,
    }
}
