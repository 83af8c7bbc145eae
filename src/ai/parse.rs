//! Model output extraction
//!
//! Models wrap JSON in markdown fences, prose, or both. Every heuristic
//! for digging the payload out lives here so the rest of the gateway can
//! work with typed values.

use serde_json::Value;

/// Extract the first JSON value from free-form model text
pub fn extract_json(text: &str) -> Option<Value> {
    let candidate = strip_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(value);
    }

    // Last resort: the widest {...} or [...] span, whichever opens first
    let mut spans: Vec<(usize, usize)> = Vec::new();
    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}'))
        && end > start
    {
        spans.push((start, end));
    }
    if let (Some(start), Some(end)) = (candidate.find('['), candidate.rfind(']'))
        && end > start
    {
        spans.push((start, end));
    }
    spans.sort_by_key(|(start, _)| *start);

    for (start, end) in spans {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate[start..=end]) {
            return Some(value);
        }
    }
    None
}

/// Drop a surrounding ```json ... ``` (or bare ```) fence if present
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let rest = if let Some((_, rest)) = trimmed.split_once("```json") {
        rest
    } else if let Some((_, rest)) = trimmed.split_once("```") {
        rest
    } else {
        return trimmed;
    };
    match rest.split_once("```") {
        Some((inner, _)) => inner.trim(),
        None => rest.trim(),
    }
}
