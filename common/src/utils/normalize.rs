//! Canonicalisation of field names, titles and search terms.
//!
//! Everything here is pure and total: every input string has a defined output.

use crate::storage::types::fields::{FieldMap, FieldValue};

/// Characters with a meaning in full-text query syntax.
const QUERY_SYNTAX_CHARS: &[char] = &[
    '@', '!', '{', '}', '(', ')', '[', ']', '|', '>', '<', '"', '~', '*', ':', '\\',
];

/// Turns a raw column header or field name into a snake_case key.
///
/// Trims, lowercases, collapses runs of whitespace and hyphens into one `_`,
/// then drops every character that is not a word character.
pub fn to_field_key(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut key = String::with_capacity(lowered.len());
    let mut in_separator_run = false;

    for ch in lowered.chars() {
        if ch.is_whitespace() || ch == '-' {
            if !in_separator_run {
                key.push('_');
                in_separator_run = true;
            }
            continue;
        }
        in_separator_run = false;
        if ch.is_alphanumeric() || ch == '_' {
            key.push(ch);
        }
    }

    key
}

/// Comparison form of a title: lowercase ASCII letters and digits only.
pub fn normalize_title(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Concatenates the given columns in order, space separated. Missing columns
/// contribute an empty string so positions stay stable.
pub fn build_searchable_text(fields: &FieldMap, columns: &[&str]) -> String {
    let joined = columns
        .iter()
        .map(|column| fields.text(column))
        .collect::<Vec<_>>()
        .join(" ");

    joined.trim_end().to_string()
}

/// Joins only the present, non-blank parts. Used where the source fields are
/// optional tags rather than fixed columns.
pub fn join_present_parts<'a>(parts: impl IntoIterator<Item = Option<&'a FieldValue>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|value| !value.is_blank())
        .map(FieldValue::stringify)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Neutralises query-syntax characters and punctuation so the text can be fed
/// to the title analyzer as plain terms. Lowercased, single spaced.
pub fn to_search_terms(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|ch| {
            if QUERY_SYNTAX_CHARS.contains(&ch) || !(ch.is_alphanumeric() || ch.is_whitespace()) {
                ' '
            } else {
                ch
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_keys_are_snake_cased() {
        assert_eq!(to_field_key("Book Title"), "book_title");
        assert_eq!(to_field_key("  Tone - and   Style "), "tone_and_style");
        assert_eq!(to_field_key("User-Goal Alignment?"), "user_goal_alignment");
        assert_eq!(to_field_key("Stage of Wellness (Journey)"), "stage_of_wellness_journey");
        assert_eq!(to_field_key(""), "");
    }

    #[test]
    fn titles_normalize_to_alphanumerics() {
        assert_eq!(normalize_title("  The Four Agreements! "), "thefouragreements");
        assert_eq!(normalize_title("the four agreements"), "thefouragreements");
        assert_eq!(normalize_title("..."), "");
    }

    #[test]
    fn normalize_title_is_idempotent() {
        for raw in ["Hello, World!", "ÆON flux 2", "  mixed CASE_title-99 ", ""] {
            let once = normalize_title(raw);
            assert_eq!(normalize_title(&once), once);
        }
    }

    #[test]
    fn searchable_text_follows_column_order_not_field_order() {
        let forward: FieldMap = [("book_title", "Atomic Habits"), ("dimension", "Physical")]
            .into_iter()
            .collect();
        let reversed: FieldMap = [("dimension", "Physical"), ("book_title", "Atomic Habits")]
            .into_iter()
            .collect();
        let columns = ["book_title", "audience", "dimension"];

        let a = build_searchable_text(&forward, &columns);
        let b = build_searchable_text(&reversed, &columns);

        assert_eq!(a, b);
        assert_eq!(a, "Atomic Habits  Physical");
    }

    #[test]
    fn searchable_text_trims_trailing_gaps_and_joins_lists() {
        let mut fields = FieldMap::new();
        fields.insert("book_title", "The Four Agreements");
        fields.insert("sub_themes", vec!["Peace".to_string(), "Freedom".to_string()]);

        let text = build_searchable_text(&fields, &["book_title", "sub_themes", "audience"]);
        assert_eq!(text, "The Four Agreements Peace, Freedom");
    }

    #[test]
    fn present_parts_skip_missing_values() {
        let title = FieldValue::from("Morning Yoga");
        let tags = FieldValue::from(vec!["PhysicalHealth".to_string()]);
        let blank = FieldValue::from("");
        let text = join_present_parts([Some(&title), None, Some(&blank), Some(&tags)]);
        assert_eq!(text, "Morning Yoga PhysicalHealth");
    }

    #[test]
    fn search_terms_drop_query_syntax() {
        assert_eq!(to_search_terms("@book_title:(Atomic*) \"Habits\""), "book title atomic habits");
        assert_eq!(to_search_terms("Don't   Panic!"), "don t panic");
        assert_eq!(to_search_terms("   "), "");
    }
}
