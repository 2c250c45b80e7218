use std::sync::OnceLock;

use regex::Regex;

/// Length of a YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

fn id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:v=|youtu\.be/|/)([0-9A-Za-z_-]{11})").ok())
        .as_ref()
}

fn is_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

/// Finds the 11-character video id in a watch URL, a short link, or a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let trimmed = input.trim();

    if let Some(id) = id_pattern()
        .and_then(|pattern| pattern.captures(trimmed))
        .and_then(|captures| captures.get(1))
    {
        return Some(id.as_str().to_string());
    }

    (trimmed.chars().count() == VIDEO_ID_LEN && trimmed.chars().all(is_id_char))
        .then(|| trimmed.to_string())
}
