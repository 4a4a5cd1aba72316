//! Post-processing: turn raw service output into a [`ResumeRecord`].
//!
//! Even when asked for JSON only, models wrap their answer in artefacts:
//!
//! - ` ```json … ``` ` fences
//! - a bare `json` language tag or stray backticks without a fence
//! - a sentence of commentary before the opening `{`
//!
//! [`clean_response`] removes these in a fixed order. [`parse_record`] then
//! parses the cleaned text; if strict parsing fails it applies exactly one
//! repair (every `'` becomes `"`) and tries once more.
//!
//! ## Known limitation
//!
//! The quote repair also rewrites apostrophes inside values, so a response
//! like `{'note': 'don't'}` stays unparseable and `{'a': 'it's'}`-style
//! values can come back corrupted. The repair is kept as a single, literal
//! substitution; it is not made smarter.

use crate::error::AnalysisError;
use crate::record::ResumeRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub record: ResumeRecord,
    /// True when the quote-repair pass was needed.
    pub repaired: bool,
}

/// Apply all cleanup rules to the raw service output.
///
/// Rules (applied in order):
/// 1. Trim surrounding whitespace
/// 2. Unwrap an outer triple-backtick fence with optional language tag
/// 3. Strip stray backticks left at either end
/// 4. Strip a leading bare `json` tag
/// 5. Cut to the outermost `{ … }` span when text surrounds the object
pub fn clean_response(raw: &str) -> String {
    let s = raw.trim();
    let s = strip_code_fence(s);
    let s = strip_stray_backticks(s);
    let s = strip_language_tag(s);
    extract_object_span(s).to_string()
}

// ── Rule 2: Outer fence ──────────────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```+[ \t]*(\w*)[ \t]*\r?\n?(.*?)\r?\n?\s*```+$").unwrap());

fn strip_code_fence(input: &str) -> &str {
    match RE_FENCE.captures(input).and_then(|c| c.get(2)) {
        Some(inner) => inner.as_str().trim(),
        None => input,
    }
}

// ── Rule 3: Stray backticks ──────────────────────────────────────────────────

fn strip_stray_backticks(input: &str) -> &str {
    input.trim_matches('`').trim()
}

// ── Rule 4: Bare language tag ────────────────────────────────────────────────

fn strip_language_tag(input: &str) -> &str {
    match input.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => {
            let rest = &input[4..];
            if rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[') {
                rest.trim_start()
            } else {
                input
            }
        }
        _ => input,
    }
}

// ── Rule 5: Outermost object span ────────────────────────────────────────────

fn extract_object_span(input: &str) -> &str {
    if input.starts_with('{') {
        return input;
    }
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => &input[start..=end],
        _ => input,
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

/// Parse cleaned text into a record, with one quote-repair retry.
///
/// The `ParseFailure` error carries the *first* parse error and the cleaned
/// text (before repair). A top-level value that is valid JSON but not an
/// object counts as a parse failure.
pub fn parse_record(
    cleaned: &str,
    on_repair: impl FnOnce(),
) -> Result<ParsedResponse, AnalysisError> {
    let first_err = match parse_object(cleaned) {
        Ok(record) => {
            return Ok(ParsedResponse {
                record,
                repaired: false,
            })
        }
        Err(e) => e,
    };

    warn!("Response is not valid JSON ({first_err}); retrying with quote repair");
    on_repair();

    let repaired = cleaned.replace('\'', "\"");
    match parse_object(&repaired) {
        Ok(record) => {
            debug!("Quote repair succeeded");
            Ok(ParsedResponse {
                record,
                repaired: true,
            })
        }
        Err(_) => Err(AnalysisError::ParseFailure {
            source: first_err,
            cleaned: cleaned.to_string(),
        }),
    }
}

fn parse_object(text: &str) -> Result<ResumeRecord, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    ResumeRecord::from_value(&value).ok_or_else(|| {
        <serde_json::Error as serde::de::Error>::custom(format!(
            "expected a JSON object at the top level, got {}",
            kind_of(&value)
        ))
    })
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
