use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::manual::{AnalysisResult, Language};

/// Used when the model gives no usable timestamps
pub const DEFAULT_TIMESTAMPS: [u32; 3] = [5, 15, 30];

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("fenced json pattern is valid")
});

/// Turn the model's text reply into Markdown plus screenshot timestamps.
///
/// Fields are read leniently: a field of an unexpected type is treated as
/// missing rather than rejecting the whole reply. Replies that contain no
/// parsable JSON object are passed through as the manual body with
/// [`DEFAULT_TIMESTAMPS`].
pub fn parse_model_output(text: &str, language: Language) -> AnalysisResult {
    let parsed = extract_json(text)
        .ok_or_else(|| "no JSON object found".to_string())
        .and_then(|json| serde_json::from_str::<Value>(json).map_err(|e| e.to_string()))
        .and_then(|value| match value {
            Value::Object(manual) => Ok(manual),
            _ => Err("reply JSON is not an object".to_string()),
        });

    match parsed {
        Ok(manual) => {
            let result = AnalysisResult {
                manual_content: render_markdown(&manual, language),
                screenshot_timestamps: collect_timestamps(&manual),
            };
            debug!(
                timestamps = ?result.screenshot_timestamps,
                "Parsed model output"
            );
            result
        }
        Err(reason) => {
            warn!(%reason, "Model output is not valid manual JSON, using raw text");
            AnalysisResult {
                manual_content: text.to_string(),
                screenshot_timestamps: DEFAULT_TIMESTAMPS.to_vec(),
            }
        }
    }
}

/// Fenced ```json block first, then the outermost brace span
fn extract_json(text: &str) -> Option<&str> {
    if let Some(caps) = FENCED_JSON.captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strings as-is, other scalars in their JSON form; null, arrays and objects are absent
fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => value.map(Value::to_string),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn steps(manual: &Map<String, Value>) -> Option<&Vec<Value>> {
    manual.get("steps").and_then(Value::as_array)
}

fn render_markdown(manual: &Map<String, Value>, language: Language) -> String {
    let (overview_heading, steps_heading) = match language {
        Language::Ja => ("概要", "手順"),
        Language::En => ("Overview", "Steps"),
    };

    let title = text_field(manual.get("title"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| language.default_title().to_string());

    let mut out = String::new();
    let _ = write!(out, "# {}\n\n", title);

    if let Some(overview) = text_field(manual.get("overview")).filter(|o| !o.trim().is_empty()) {
        let _ = write!(out, "## {}\n{}\n\n", overview_heading, overview);
    }

    let _ = write!(out, "## {}\n\n", steps_heading);

    for (index, step) in steps(manual).into_iter().flatten().enumerate() {
        let number = step
            .get("stepNumber")
            .and_then(as_seconds)
            .map(u64::from)
            .unwrap_or(index as u64 + 1);
        let _ = write!(
            out,
            "### {}. {}\n\n{}\n\n![Step {}](PLACEHOLDER_IMAGE_{})\n\n",
            number,
            text_field(step.get("action")).unwrap_or_default(),
            text_field(step.get("description")).unwrap_or_default(),
            number,
            index
        );
    }

    out
}

/// Top-level `timestamps` when it is an array, else the step timestamps
fn collect_timestamps(manual: &Map<String, Value>) -> Vec<u32> {
    let declared = manual.get("timestamps").and_then(Value::as_array);
    let timestamps: Vec<u32> = match (declared, steps(manual)) {
        (Some(values), _) => values.iter().filter_map(as_seconds).collect(),
        (None, Some(steps)) => steps
            .iter()
            .filter_map(|s| s.get("timestamp").and_then(as_seconds))
            .collect(),
        (None, None) => Vec::new(),
    };

    if timestamps.is_empty() {
        DEFAULT_TIMESTAMPS.to_vec()
    } else {
        timestamps
    }
}

/// Non-negative JSON numbers as whole seconds; fractions are truncated
fn as_seconds(value: &Value) -> Option<u32> {
    let number = value.as_f64()?;
    if number.is_finite() && number >= 0.0 && number <= f64::from(u32::MAX) {
        Some(number.trunc() as u32)
    } else {
        None
    }
}
