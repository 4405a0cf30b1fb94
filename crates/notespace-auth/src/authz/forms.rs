//! Form name extraction from entry payloads.
//!
//! Entries declare their governing form directly (`form`), through
//! properties (`properties.form`), or in the front matter of their
//! markdown body. Entries with no declared form fall back to the baseline
//! space action.

use serde_json::Value;

const FRONT_MATTER_FENCE: &str = "---";

/// Resolve the governing form name from an entry payload.
pub fn form_name_from_entry(entry: &Value) -> Option<String> {
    if let Some(form) = non_empty_str(entry.get("form")) {
        return Some(form);
    }
    if let Some(form) = non_empty_str(entry.get("properties").and_then(|p| p.get("form"))) {
        return Some(form);
    }
    for field in ["markdown", "content"] {
        if let Some(text) = entry.get(field).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return form_name_from_markdown(text);
            }
        }
    }
    None
}

/// Resolve the governing form name from a markdown body's front matter.
pub fn form_name_from_markdown(markdown: &str) -> Option<String> {
    let mut lines = markdown.lines();
    if lines.next()?.trim() != FRONT_MATTER_FENCE {
        return None;
    }
    for line in lines {
        let trimmed = line.trim();
        if trimmed == FRONT_MATTER_FENCE {
            break;
        }
        if let Some(value) = trimmed.strip_prefix("form:") {
            let value = value.trim().trim_matches('"').trim_matches('\'').trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
