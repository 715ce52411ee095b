//! Partial-ratio similarity scoring.
//!
//! `ratio` is the normalized indel similarity of two strings on a 0-100 scale:
//! `100 * 2 * lcs / (len_a + len_b)`. `partial_ratio` slides the shorter
//! string over the longer one and keeps the best window, including the
//! partial windows that overhang either edge.

/// Similarity of two whole strings, 0-100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best local alignment score of the shorter string against the longer one, 0-100.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return if a.is_empty() && b.is_empty() { 100.0 } else { 0.0 };
    }

    if a.len() < b.len() {
        best_window(&a, &b)
    } else if a.len() > b.len() {
        best_window(&b, &a)
    } else {
        let forward = best_window(&a, &b);
        if forward >= 100.0 {
            forward
        } else {
            forward.max(best_window(&b, &a))
        }
    }
}

fn best_window(needle: &[char], haystack: &[char]) -> f64 {
    let m = needle.len();
    let n = haystack.len();
    let mut best = 0.0_f64;

    // windows entering from the left edge
    for end in 1..m {
        best = best.max(ratio_chars(needle, &haystack[..end]));
    }

    for start in 0..=(n - m) {
        let score = ratio_chars(needle, &haystack[start..start + m]);
        if score >= 100.0 {
            return 100.0;
        }
        best = best.max(score);
    }

    // windows leaving through the right edge
    for start in (n - m + 1)..n {
        best = best.max(ratio_chars(needle, &haystack[start..]));
    }

    best
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(a, b);
    100.0 * (2 * lcs) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_disjoint() {
        assert_eq!(ratio("abc", "abc"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(partial_ratio("", ""), 100.0);
        assert_eq!(partial_ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_substring_scores_full() {
        assert_eq!(partial_ratio("KFC", "Cliente: KFC España"), 100.0);
        assert_eq!(partial_ratio("Cliente: KFC España", "KFC"), 100.0);
    }

    #[test]
    fn test_single_substitution_in_the_middle_scores_ninety() {
        // one differing char out of ten, away from the edges
        assert_eq!(partial_ratio("abcdeFghij", "abcdeXghij"), 90.0);
        assert_eq!(partial_ratio("abcdeFghij", "zz abcdeXghij zz"), 90.0);
    }

    #[test]
    fn test_eleven_differences_in_a_hundred_score_eighty_nine() {
        let candidate = format!("{}{}{}", "a".repeat(45), "b".repeat(11), "d".repeat(44));
        let text = format!("{}{}{}", "a".repeat(45), "c".repeat(11), "d".repeat(44));
        assert_eq!(partial_ratio(&candidate, &text), 89.0);
    }

    #[test]
    fn test_case_sensitive() {
        assert!(partial_ratio("kfc", "KFC") < 90.0);
    }

    #[test]
    fn test_symmetric_for_equal_lengths() {
        let a = "Barcelona";
        let b = "Barcelone";
        assert_eq!(partial_ratio(a, b), partial_ratio(b, a));
    }
}
