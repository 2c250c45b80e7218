//! Edit-distance based similarity on a 0–100 scale.

use strsim::normalized_levenshtein;

/// Length ratio above which substring alignment is also considered.
const PARTIAL_LENGTH_RATIO: f64 = 1.5;
const PARTIAL_SCALE: f64 = 0.9;
const TOKEN_SORT_SCALE: f64 = 0.95;

/// Similarity of two strings, 0 (unrelated) to 100 (identical after
/// lowercasing). Takes the best of a plain ratio, a token-order independent
/// ratio and, when one side is much longer, the best aligned substring.
pub fn score(query: &str, candidate: &str) -> f64 {
    let a = query.trim().to_lowercase();
    let b = candidate.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let plain = ratio(&a, &b);
    let token_sort = ratio(&sorted_tokens(&a), &sorted_tokens(&b)) * TOKEN_SORT_SCALE;

    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    #[allow(clippy::cast_precision_loss)]
    let length_ratio = longer.chars().count() as f64 / shorter.chars().count() as f64;
    let partial = if length_ratio >= PARTIAL_LENGTH_RATIO {
        partial_ratio(shorter, longer) * PARTIAL_SCALE
    } else {
        0.0
    };

    plain.max(token_sort).max(partial)
}

/// Ranks `candidates` against `query`, keeping at most `limit` entries whose
/// score reaches `cutoff`. Ties keep candidate order.
pub fn extract_best<'a, T>(
    query: &str,
    candidates: impl IntoIterator<Item = (&'a str, T)>,
    limit: usize,
    cutoff: f64,
) -> Vec<(T, f64)> {
    let mut scored: Vec<(T, f64)> = candidates
        .into_iter()
        .map(|(text, item)| (item, score(query, text)))
        .filter(|(_, value)| *value >= cutoff)
        .collect();

    scored.sort_by(|left, right| right.1.total_cmp(&left.1));
    scored.truncate(limit);
    scored
}

fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * 100.0
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn partial_ratio(shorter: &str, longer: &str) -> f64 {
    let needle_len = shorter.chars().count();
    let haystack: Vec<char> = longer.chars().collect();

    haystack
        .windows(needle_len)
        .map(|window| ratio(shorter, &window.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_full() {
        assert!((score("Atomic Habits", "atomic habits") - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert!(score("", "anything").abs() < f64::EPSILON);
        assert!(score("anything", "   ").abs() < f64::EPSILON);
    }

    #[test]
    fn typos_score_high_and_unrelated_titles_low() {
        assert!(score("thefouragrements", "thefouragreements") > 90.0);
        assert!(score("thefouragreements", "atomichabits") < 40.0);
    }

    #[test]
    fn short_query_matches_inside_long_title() {
        assert!(score("yoga", "10 Minute Morning Yoga for Beginners") > 80.0);
    }

    #[test]
    fn token_order_is_tolerated() {
        assert!(score("habits atomic", "Atomic Habits") > 90.0);
    }

    #[test]
    fn extract_best_applies_cutoff_and_limit() {
        let titles = [
            "Morning Yoga Flow",
            "Evening Yoga Stretch",
            "Tax Accounting Basics",
            "Yoga Nidra",
        ];
        let best = extract_best("yoga", titles.iter().map(|title| (*title, *title)), 2, 40.0);

        assert_eq!(best.len(), 2);
        assert!(best.iter().all(|(title, _)| title.contains("Yoga")));
        assert!(best[0].1 >= best[1].1);
    }
}
