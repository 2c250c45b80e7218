use std::sync::OnceLock;

use regex::Regex;

fn fenced_json() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)```json(.*?)```").ok())
        .as_ref()
}

/// Returns the body of the first ```` ```json ```` block, or the whole reply
/// when the model answered without a fence.
pub fn extract_json_payload(reply: &str) -> &str {
    fenced_json()
        .and_then(|pattern| pattern.captures(reply))
        .and_then(|captures| captures.get(1))
        .map_or(reply, |body| body.as_str())
        .trim()
}
