//! Similarity primitives for duplicate detection.
//!
//! File names are short and typo-prone, so they get edit distance.
//! Document bodies are long and reflowed by extraction, so they get
//! token-set overlap, which shrugs off ordering and whitespace noise.

use std::collections::HashSet;

/// Normalized Levenshtein similarity in [0, 1]. Case-insensitive.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let max_len = a.len().max(b.len());
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Two-row dynamic-programming edit distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Jaccard similarity of the token sets of two texts.
///
/// Tokens are lowercased, stripped of punctuation, and must be longer
/// than two characters so articles and stray OCR fragments don't inflate
/// the overlap. Two empty texts count as identical.
pub fn jaccard_tokens(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect()
}

/// File-name similarity: extensions are ignored so `lease.pdf` and
/// `lease.jpg` compare by stem alone.
pub fn file_name_similarity(a: &str, b: &str) -> f64 {
    levenshtein_ratio(strip_extension(a), strip_extension(b))
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(levenshtein_ratio("passport", "passport"), 1.0);
        assert_eq!(jaccard_tokens("the same text body", "the same text body"), 1.0);
    }

    #[test]
    fn near_identical_names_score_high() {
        let score = file_name_similarity("passport.pdf", "passport_scan.pdf");
        assert!(score >= 0.6, "got {score}");
        let close = file_name_similarity("lease_v1.pdf", "lease_v2.pdf");
        assert!(close >= 0.8, "got {close}");
    }

    #[test]
    fn unrelated_names_score_low() {
        let score = file_name_similarity("passport.pdf", "kontoauszug_januar.pdf");
        assert!(score < 0.5, "got {score}");
    }

    #[test]
    fn token_overlap_survives_reordering() {
        let a = "monthly rent 950 euro payable first business day";
        let b = "payable first business day monthly rent 950 euro";
        assert_eq!(jaccard_tokens(a, b), 1.0);
    }

    #[test]
    fn short_tokens_ignored() {
        // "of", "to", "a" never enter the token sets
        assert_eq!(jaccard_tokens("of to a", "by in it"), 1.0);
        let a = "certificate of birth issued";
        let b = "certificate birth issued";
        assert_eq!(jaccard_tokens(a, b), 1.0);
    }

    #[test]
    fn empty_against_text_scores_zero() {
        assert_eq!(jaccard_tokens("", "rental agreement terms"), 0.0);
    }

    #[test]
    fn edit_distance_symmetric() {
        assert_eq!(
            levenshtein_ratio("mietvertrag", "untermietvertrag"),
            levenshtein_ratio("untermietvertrag", "mietvertrag")
        );
    }
}
