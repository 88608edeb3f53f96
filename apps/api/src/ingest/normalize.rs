use serde_json::Value;
use tracing::warn;

use crate::ingest::IngestError;
use crate::models::CandidateAnalysis;

/// Strips code fences the extractor may wrap around its JSON.
///
/// Handles ```` ```json ```` / ```` ``` ```` openers (any case), a missing
/// closing fence, and prose before the first fence.
pub fn unwrap_payload(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find("```") else {
        return text;
    };
    let body = &text[start + 3..];
    let body = match body.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &body[4..],
        _ => body,
    };
    let body = body.trim_start();
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim_end(),
    }
}

/// Unwraps, parses and default-fills extractor output.
///
/// Anything that is not a JSON object after unwrapping is an
/// [`IngestError::ExtractionFormat`]; an object with missing or oddly shaped
/// fields is never rejected.
pub fn normalize_analysis(raw: &str) -> Result<CandidateAnalysis, IngestError> {
    let payload = unwrap_payload(raw);
    let value: Value = serde_json::from_str(payload).map_err(|e| {
        warn!("Extractor output is not JSON: {e}");
        IngestError::ExtractionFormat(e.to_string())
    })?;

    if !value.is_object() {
        return Err(IngestError::ExtractionFormat(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }

    serde_json::from_value(value).map_err(|e| IngestError::ExtractionFormat(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
