//! Recovery of one JSON object from free-form model output.
//!
//! Generative APIs wrap JSON in prose or code fences and sometimes stop
//! mid-document. [`extract_json`] strips the fences, isolates the first
//! top-level object and, if it never closes, appends the missing closers.
//! Repair is bounded by [`RepairLimits`]; when it is exhausted callers get an
//! [`ExtractError`] and substitute their own fallback payload.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for extraction.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Why no object could be recovered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("No JSON object found in response")]
    NoObject,

    #[error("Response has {needed} unclosed brackets (limit {limit})")]
    TooManyUnclosed { needed: usize, limit: usize },

    #[error("Malformed JSON after {attempts} repair attempts: {message}")]
    Malformed { attempts: usize, message: String },

    #[error("JSON does not match expected shape: {0}")]
    Shape(String),
}

/// Bounds on the repair heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairLimits {
    /// Maximum number of `}`/`]` that may be appended to balance a document.
    pub max_appended_closers: usize,
    /// Maximum number of parse attempts across all passes.
    pub max_attempts: usize,
}

impl Default for RepairLimits {
    fn default() -> Self {
        Self {
            max_appended_closers: 32,
            max_attempts: 3,
        }
    }
}

/// Extract a JSON object using the default [`RepairLimits`].
pub fn extract_json(text: &str) -> ExtractResult<Value> {
    extract_json_with(text, RepairLimits::default())
}

/// Extract and decode into `T`.
pub fn extract_as<T: DeserializeOwned>(text: &str) -> ExtractResult<T> {
    let value = extract_json(text)?;
    serde_json::from_value(value).map_err(|e| ExtractError::Shape(e.to_string()))
}

/// Extract a JSON object with explicit repair limits.
pub fn extract_json_with(text: &str, limits: RepairLimits) -> ExtractResult<Value> {
    let cleaned = strip_fences(text);
    let start = cleaned.find('{').ok_or(ExtractError::NoObject)?;
    let body = &cleaned[start..];

    let mut attempts = 0;
    let mut last_error = String::from("no parse attempted");

    // First pass: the object as written, balanced if it never closes.
    let candidate = balance(body, limits)?;
    attempts += 1;
    match serde_json::from_str::<Value>(&candidate) {
        Ok(value) => return Ok(value),
        Err(e) => last_error = e.to_string(),
    }

    // Second pass: cut at the last closing brace and rebalance. Drops a
    // trailing fragment such as a half-written key or literal.
    let mut cut = body;
    while attempts < limits.max_attempts {
        let Some(end) = cut.rfind('}') else { break };
        cut = &cut[..end + 1];
        let candidate = balance(cut, limits)?;
        attempts += 1;
        match serde_json::from_str::<Value>(&candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e.to_string(),
        }
        // Step past this brace for the next attempt.
        cut = &cut[..end];
    }

    Err(ExtractError::Malformed {
        attempts,
        message: last_error,
    })
}

/// Remove Markdown code fences (```` ``` ```` and ```` ```json ````).
fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            rest = &rest[4..];
        }
    }
    out.push_str(rest);
    out
}

/// Outcome of scanning from an opening brace.
enum Scan {
    /// The top-level object closes at this byte offset (exclusive).
    Closed(usize),
    /// Input ended with these closers still owed, innermost last.
    Open { owed: Vec<char>, in_string: bool },
}

fn scan(body: &str) -> Scan {
    let mut owed: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => owed.push('}'),
            '[' => owed.push(']'),
            '}' | ']' => {
                owed.pop();
                if owed.is_empty() {
                    return Scan::Closed(idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    Scan::Open { owed, in_string }
}

/// Slice at the matching close, or append the owed closers.
fn balance(body: &str, limits: RepairLimits) -> ExtractResult<String> {
    match scan(body) {
        Scan::Closed(end) => Ok(body[..end].to_string()),
        Scan::Open { owed, in_string } => {
            if owed.len() > limits.max_appended_closers {
                return Err(ExtractError::TooManyUnclosed {
                    needed: owed.len(),
                    limit: limits.max_appended_closers,
                });
            }
            let mut repaired = body.trim_end().to_string();
            if in_string {
                if repaired.ends_with('\\') {
                    repaired.pop();
                }
                repaired.push('"');
            }
            while repaired.ends_with(',') || repaired.ends_with(char::is_whitespace) {
                repaired.pop();
            }
            repaired.extend(owed.iter().rev());
            Ok(repaired)
        }
    }
}
