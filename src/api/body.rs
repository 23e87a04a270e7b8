//! Raw request body interpretation.
//!
//! Clients of this service are editors and scripts that ship code snippets
//! inside JSON by hand, so bodies arrive with literal newlines and unescaped
//! quotes more often than not. Interpretation therefore runs in three stages:
//!
//! 1. strict JSON parse of the body text;
//! 2. on failure, a quote-aware sanitizing pass that escapes literal
//!    newline/carriage-return characters inside string values, then one
//!    re-parse;
//! 3. on continued failure, heuristic field extraction that slices the
//!    `code` value out of the raw text between its key marker and the
//!    `"language"` marker, tolerating unescaped quotes and newlines.
//!
//! Whichever stage succeeds, the `code` value is reproduced exactly as it
//! appeared between its delimiters. Only when all three fail does the body
//! count as malformed.

use serde_json::Value;

use crate::errors::{ApiError, ErrorCode, FieldError};
use crate::review::model::ReviewRequest;

/// Interpret raw bytes into a validated [`ReviewRequest`].
pub fn interpret(raw: &[u8]) -> Result<ReviewRequest, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::MissingArgument {
            field: "body".to_string(),
        });
    }

    let text = std::str::from_utf8(raw).map_err(|cause| ApiError::MalformedBody {
        cause: anyhow::Error::new(cause),
    })?;

    let payload = load_payload(text)?;
    validate(payload)
}

/// Parse the body text, trying each interpretation stage in order.
fn load_payload(text: &str) -> Result<Value, ApiError> {
    let first_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let sanitized = sanitize_control_chars(text);
    if sanitized != text {
        if let Ok(value) = serde_json::from_str::<Value>(&sanitized) {
            return Ok(value);
        }
    }

    if let Some(value) = heuristic_parse(text) {
        return Ok(value);
    }

    Err(ApiError::MalformedBody {
        cause: anyhow::Error::new(first_error),
    })
}

/// Escape literal newline/CR characters inside quoted strings.
///
/// A single left-to-right scan tracks string state (toggled on unescaped
/// `"`) and a pending escape (set by `\`); characters outside strings pass
/// through untouched.
fn sanitize_control_chars(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape_next = false;

    for ch in text.chars() {
        if escape_next {
            result.push(ch);
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => {
                result.push(ch);
                escape_next = true;
            }
            '"' => {
                result.push(ch);
                in_string = !in_string;
            }
            '\n' if in_string => result.push_str("\\n"),
            '\r' if in_string => result.push_str("\\r"),
            _ => result.push(ch),
        }
    }

    result
}

/// Slice the known fields out of the raw text.
///
/// `code` is delimited by its key marker and the `"language"` marker that
/// must follow it; the last quote before that marker closes the value, so
/// unescaped quotes and newlines inside survive. `language` and `style`
/// are read as minimal quoted scalars. Without a recoverable `code` value
/// the whole pass fails.
fn heuristic_parse(text: &str) -> Option<Value> {
    let code = extract_between_keys(text, "code", "language")?;

    let mut payload = serde_json::Map::new();
    payload.insert("code".to_string(), Value::String(code));
    if let Some(language) = extract_simple_value(text, "language") {
        payload.insert("language".to_string(), Value::String(language));
    }
    if let Some(style) = extract_simple_value(text, "style") {
        payload.insert("style".to_string(), Value::String(style));
    }
    Some(Value::Object(payload))
}

fn extract_between_keys(text: &str, target_key: &str, next_key: &str) -> Option<String> {
    let target_marker = format!("\"{target_key}\"");
    let next_marker = format!("\"{next_key}\"");

    let target_index = text.find(&target_marker)?;
    let after_colon = text[target_index..].find(':')? + target_index;
    let start_quote = text[after_colon..].find('"')? + after_colon;
    let next_index = text[start_quote..].find(&next_marker)? + start_quote;

    let segment = &text[start_quote + 1..next_index];
    let closing_quote = segment.rfind('"')?;
    Some(segment[..closing_quote].to_string())
}

fn extract_simple_value(text: &str, key: &str) -> Option<String> {
    let marker = format!("\"{key}\"");

    let key_index = text.find(&marker)?;
    let after_colon = text[key_index..].find(':')? + key_index;
    let start_quote = text[after_colon..].find('"')? + after_colon;

    let rest = &text[start_quote + 1..];
    let end_quote = rest.find('"')?;
    Some(rest[..end_quote].to_string())
}

/// Check the interpreted payload against the request schema.
///
/// `code` must be a non-blank string; `language` and `style` are optional
/// strings, trimmed, with blank values treated as absent. Every offending
/// field produces its own entry. A `null` body is reported against the
/// `body` field itself; any other non-object against `general`.
fn validate(payload: Value) -> Result<ReviewRequest, ApiError> {
    if payload.is_null() {
        return Err(ApiError::Validation {
            errors: vec![FieldError::new("body", ErrorCode::InvalidArgument.message())],
        });
    }
    let Value::Object(map) = payload else {
        return Err(ApiError::Validation {
            errors: vec![FieldError::new(
                "general",
                "The request body must be a JSON object.",
            )],
        });
    };

    let mut errors = Vec::new();

    let code = match map.get("code") {
        None => {
            errors.push(FieldError::new("code", "Field required"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(FieldError::new("code", "Code must not be empty."));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new("code", "Input should be a valid string"));
            None
        }
    };

    let language = optional_text(&map, "language", &mut errors);
    let style = optional_text(&map, "style", &mut errors);

    match (errors.is_empty(), code) {
        (true, Some(code)) => Ok(ReviewRequest {
            code,
            language,
            style,
        }),
        _ => Err(ApiError::Validation { errors }),
    }
}

fn optional_text(
    map: &serde_json::Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match map.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            errors.push(FieldError::new(field, "Input should be a valid string"));
            None
        }
    }
}
