//! Fuzzy title suggestions.

use serde::Serialize;

/// Suggestions returned per query.
pub const MAX_SUGGESTIONS: usize = 10;

/// Only candidates scoring strictly above this are suggested.
pub const SCORE_CUTOFF: u8 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub title: String,
    pub score: u8,
}

/// Rank `titles` against free-text `input`, best first. Ties order by title.
pub fn suggest(input: &str, titles: &[String]) -> Vec<Suggestion> {
    let query = input.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<Suggestion> = titles
        .iter()
        .map(|t| Suggestion {
            title: t.clone(),
            score: score(&query, &t.to_lowercase()),
        })
        .filter(|s| s.score > SCORE_CUTOFF)
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.title.cmp(&b.title)));
    scored.truncate(MAX_SUGGESTIONS);
    scored
}

/// Similarity on a 0-100 scale: the better of a whole-string ratio and a
/// best-substring ratio. Substring matches are discounted when one side is
/// much longer than the other.
pub fn score(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let full = strsim::normalized_levenshtein(a, b);

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    let long_len = long.chars().count();

    let mut partial = partial_ratio(short, long, short_len);
    if long_len as f64 / short_len as f64 > 1.5 {
        partial *= 0.9;
    }

    (full.max(partial) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Best normalised Levenshtein between `short` and any window of `long`
/// with the same number of characters.
fn partial_ratio(short: &str, long: &str, short_len: usize) -> f64 {
    let long_chars: Vec<char> = long.chars().collect();
    if long_chars.len() <= short_len {
        return strsim::normalized_levenshtein(short, long);
    }

    let mut best = 0.0f64;
    for start in 0..=(long_chars.len() - short_len) {
        let window: String = long_chars[start..start + short_len].iter().collect();
        let r = strsim::normalized_levenshtein(short, &window);
        if r > best {
            best = r;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles() -> Vec<String> {
        [
            "The Godfather",
            "The Godfather: Part II",
            "The Dark Knight",
            "Heat",
            "Casino",
            "Amadeus",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn exact_title_scores_100_and_ranks_first() {
        let s = suggest("Heat", &titles());
        assert_eq!(s[0], Suggestion { title: "Heat".into(), score: 100 });
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(score("casino", "casino"), 100);
        let s = suggest("CASINO", &titles());
        assert_eq!(s[0].title, "Casino");
    }

    #[test]
    fn substring_finds_both_godfathers() {
        let s = suggest("godfather", &titles());
        let found: Vec<&str> = s.iter().map(|x| x.title.as_str()).collect();
        assert!(found.contains(&"The Godfather"));
        assert!(found.contains(&"The Godfather: Part II"));
        // The shorter title is not discounted for length
        assert_eq!(s[0].title, "The Godfather");
    }

    #[test]
    fn typos_still_match() {
        let s = suggest("Amadeos", &titles());
        assert_eq!(s[0].title, "Amadeus");
        assert!(s[0].score > SCORE_CUTOFF);
    }

    #[test]
    fn nonsense_yields_nothing() {
        assert!(suggest("zzqxv", &titles()).is_empty());
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(suggest("", &titles()).is_empty());
        assert!(suggest("   ", &titles()).is_empty());
    }

    #[test]
    fn at_most_ten_suggestions() {
        let many: Vec<String> = (0..25).map(|i| format!("Heat {i}")).collect();
        assert_eq!(suggest("heat", &many).len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn long_titles_are_discounted_for_partial_matches() {
        // "heat" sits inside both, but the 20-character title is much longer
        assert_eq!(score("heat", "heat"), 100);
        assert_eq!(score("heat", "heat of the big city"), 90);
    }
}
