//! Pull the JSON object out of a free-text LLM answer.
//!
//! LLMs wrap JSON in markdown fences and surround it with prose. We strip a
//! leading fence, take everything between the first `{` and the last `}`,
//! and parse that strictly. Nothing else is repaired.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, error};

use crate::error::ExtractError;
use crate::schema::RequirementsSpec;

/// Opening fence plus optional language tag, e.g. "```json".
static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`{3,}[A-Za-z0-9_+.\-]*").unwrap());

/// Parse an LLM response into a requirements spec without touching the disk.
pub fn parse_response(raw: &str) -> Result<RequirementsSpec, ExtractError> {
    let cleaned = strip_code_fence(raw);

    let candidate = locate_json(&cleaned).ok_or_else(|| {
        error!(raw = %raw, "No JSON object found in LLM output");
        ExtractError::NotFound {
            raw: raw.to_string(),
        }
    })?;

    let object: Map<String, Value> = serde_json::from_str(candidate).map_err(|e| {
        error!(error = %e, "Failed to decode JSON");
        debug!(candidate = %candidate, "Extracted JSON text");
        ExtractError::MalformedJson {
            source: e,
            candidate: candidate.to_string(),
        }
    })?;

    Ok(RequirementsSpec::from_object(object))
}

/// Trim the response and, if it opens with a code fence, drop the fence,
/// its language tag and a closing fence.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let without_opening = OPENING_FENCE.replace(trimmed, "");
    without_opening
        .trim()
        .trim_end_matches('`')
        .trim()
        .to_string()
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn locate_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
