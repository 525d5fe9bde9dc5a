/// Schema validation for model replies.
///
/// The model is asked for a bare JSON object, but its output is never trusted
/// as-is. Each reply is parsed into a generic JSON value and checked field by
/// field (presence and type) before a typed result is built. Any mismatch is
/// a [`LlmError::ResponseFormat`]; there is no partial or best-effort result.
///
/// The only leniency is a single surrounding Markdown code fence
/// (```` ```json ... ``` ````), which chat models add habitually. Prose around
/// the object is still rejected.
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::{FeatureAnalysisResult, LlmError, OptimizationResult};

/// Matches a reply wrapped in one fenced code block, capturing the body.
static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n(.*?)\n?\s*```\s*$").expect("code fence regex must compile")
});

/// Parse a feature-analysis reply.
pub fn parse_feature_analysis(raw: &str) -> Result<FeatureAnalysisResult, LlmError> {
    let obj = parse_object(raw)?;
    Ok(FeatureAnalysisResult {
        high_features: string_list(&obj, "highFeatures")?,
        low_features: string_list(&obj, "lowFeatures")?,
        key_differences: string_list(&obj, "keyDifferences")?,
        recommendations: string_list(&obj, "recommendations")?,
    })
}

/// Parse an optimization reply.
pub fn parse_optimization(raw: &str) -> Result<OptimizationResult, LlmError> {
    let obj = parse_object(raw)?;
    Ok(OptimizationResult {
        score: score(&obj)?,
        strengths: string_list(&obj, "strengths")?,
        weaknesses: string_list(&obj, "weaknesses")?,
        suggestions: string_list(&obj, "suggestions")?,
        optimized_version: string_field(&obj, "optimizedVersion")?,
    })
}

/// Remove one surrounding code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    match CODE_FENCE_RE.captures(raw).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => raw,
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, LlmError> {
    let text = strip_code_fence(raw).trim();
    let value: Value = serde_json::from_str(text)
        .map_err(|e| LlmError::ResponseFormat(format!("reply is not valid JSON: {e}")))?;

    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(LlmError::ResponseFormat(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

fn string_list(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, LlmError> {
    let items = match obj.get(field) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(LlmError::ResponseFormat(format!(
                "field '{field}' must be an array of strings, got {}",
                type_name(other)
            )));
        }
        None => return Err(missing(field)),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(LlmError::ResponseFormat(format!(
                "field '{field}[{i}]' must be a string, got {}",
                type_name(other)
            ))),
        })
        .collect()
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Result<String, LlmError> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(LlmError::ResponseFormat(format!(
            "field '{field}' must be a string, got {}",
            type_name(other)
        ))),
        None => Err(missing(field)),
    }
}

/// The score must be a whole number in `0..=100`.
///
/// `75.0` is accepted as 75; `75.5`, `"75"` and `120` are not.
fn score(obj: &Map<String, Value>) -> Result<u8, LlmError> {
    let value = obj.get("score").ok_or_else(|| missing("score"))?;

    let whole = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        _ => None,
    };

    match whole {
        Some(n) if n <= 100 => Ok(n as u8),
        _ => Err(LlmError::ResponseFormat(format!(
            "field 'score' must be an integer between 0 and 100, got {value}"
        ))),
    }
}

fn missing(field: &str) -> LlmError {
    LlmError::ResponseFormat(format!("missing field '{field}'"))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
