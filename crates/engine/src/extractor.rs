//! Structured extractor: pulls the JSON payload out of free-form model text.
//!
//! Best-effort by nature:
//! 1. strip a leading/trailing code fence (optionally language-tagged)
//! 2. take the widest span from the first opening delimiter to the last closing one
//! 3. parse that span as JSON
//!
//! When the text holds several unrelated brace groups the span can cover prose
//! between them; the parse then fails with `MalformedPayload` rather than
//! guessing which group was meant.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use assure_common::error::AppError;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?").expect("valid regex"));

static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?[ \t]*```\s*$").expect("valid regex"));

/// Top-level shape the caller expects from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Object,
    Array,
}

impl PayloadShape {
    fn delimiters(&self) -> (char, char) {
        match self {
            PayloadShape::Object => ('{', '}'),
            PayloadShape::Array => ('[', ']'),
        }
    }
}

/// Remove a code fence wrapping the whole text, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let start = LEADING_FENCE.find(text).map(|m| m.end()).unwrap_or(0);
    let rest = &text[start..];
    let end = TRAILING_FENCE.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    &rest[..end]
}

/// Locate and parse the payload of the given shape.
pub fn extract(text: &str, shape: PayloadShape) -> Result<Value, AppError> {
    let body = strip_code_fences(text);
    let (open, close) = shape.delimiters();

    let start = body.find(open).ok_or(AppError::NoStructuredPayloadFound)?;
    let end = body
        .rfind(close)
        .filter(|&end| end > start)
        .ok_or(AppError::NoStructuredPayloadFound)?;

    let span = &body[start..=end];
    let value: Value = serde_json::from_str(span)?;

    tracing::debug!(span_chars = span.len(), "Extracted structured payload");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        json!({
            "vulnerabilities": [{
                "id": 1,
                "name": "Reentrancy",
                "description": "External call before state update",
                "severity": "high",
                "lineNumber": 42,
                "code": "msg.sender.call{value: amount}(\"\")",
                "recommendation": "Use checks-effects-interactions"
            }],
            "overallScore": 35,
            "summary": "One high severity issue"
        })
    }

    #[test]
    fn test_round_trip_through_wrappers() {
        let object = sample();
        let raw = serde_json::to_string_pretty(&object).unwrap();
        let wrappings = vec![
            raw.clone(),
            format!("```json\n{}\n```", raw),
            format!("```\n{}\n```", raw),
            format!("Here is the analysis you asked for:\n\n{}\n\nLet me know if you need more.", raw),
            format!("Sure.\n```json\n{}\n```\nThat is all.", raw),
            format!("  ```JSON {}```  ", raw),
        ];
        for text in wrappings {
            assert_eq!(extract(&text, PayloadShape::Object).unwrap(), object, "{}", text);
        }
    }

    #[test]
    fn test_array_payload() {
        let text = "Findings:\n```json\n[{\"id\": 1}, {\"id\": 2}]\n```\nRisk score: 40";
        let value = extract(text, PayloadShape::Array).unwrap();
        assert_eq!(value, json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_plain_prose_has_no_payload() {
        let err = extract(
            "I could not analyze this contract because the source is too short.",
            PayloadShape::Object,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NoStructuredPayloadFound));
    }

    #[test]
    fn test_closing_before_opening_has_no_payload() {
        let err = extract("} nothing here {", PayloadShape::Object).unwrap_err();
        assert!(matches!(err, AppError::NoStructuredPayloadFound));
    }

    #[test]
    fn test_invalid_span_is_malformed() {
        let err = extract("```json\n{\"overallScore\": 70,}\n```", PayloadShape::Object).unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }

    #[test]
    fn test_widest_span_crosses_unrelated_braces() {
        // Accepted heuristic risk: the span runs from the first '{' to the last '}'.
        let text = "Use {braces} carefully. {\"overallScore\": 10}";
        let err = extract(text, PayloadShape::Object).unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
        assert_eq!(strip_code_fences("```solidity\ncontract A {}\n```\n"), "contract A {}");
    }
}
