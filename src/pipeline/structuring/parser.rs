use serde::Deserialize;
use serde_json::Value;

use super::StructuringError;
use crate::models::{DocumentMeta, RawExtractionResult};

/// Characters of raw model output kept in diagnostics.
pub const PREVIEW_CHARS: usize = 200;

/// First `max_chars` characters of `s` (char-boundary safe).
pub fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```).
/// Text without a fence is returned trimmed.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches("json"),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse a model response into a JSON object, stripping any code fence.
pub fn parse_json_object(response: &str) -> Result<serde_json::Map<String, Value>, StructuringError> {
    let body = strip_code_fence(response);
    if body.is_empty() {
        return Err(StructuringError::EmptyResponse);
    }
    let value: Value = serde_json::from_str(body).map_err(|e| StructuringError::JsonParsing {
        reason: e.to_string(),
        preview: preview(response, PREVIEW_CHARS),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StructuringError::JsonParsing {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
            preview: preview(response, PREVIEW_CHARS),
        }),
    }
}

/// Parse an extraction response into a raw candidate result.
///
/// The object itself must be valid JSON. Inside it, parsing is lenient:
/// malformed `document_meta` becomes empty, a non-array `analytes` becomes
/// an empty list, and individual rows that do not deserialize are skipped.
pub fn parse_extraction_response(response: &str) -> Result<RawExtractionResult, StructuringError> {
    let mut object = parse_json_object(response)?;

    let document_meta = object
        .remove("document_meta")
        .and_then(|v| serde_json::from_value::<DocumentMeta>(v).ok())
        .unwrap_or_default();

    let analytes = match object.remove("analytes") {
        Some(Value::Array(items)) => parse_array_lenient(&items),
        _ => vec![],
    };

    Ok(RawExtractionResult {
        document_meta,
        analytes,
    })
}

/// Parse an array leniently: skip items that fail to deserialize.
pub fn parse_array_lenient<T: for<'de> Deserialize<'de>>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
