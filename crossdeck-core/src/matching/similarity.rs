//! String similarity ratios for fuzzy title+artist matching
//!
//! All metrics return 0.0-1.0 (1.0 = identical).

use crossdeck_common::config::SimilarityMetric;

/// Similarity of two normalized keys under the chosen metric
pub fn similarity(metric: SimilarityMetric, a: &str, b: &str) -> f64 {
    match metric {
        SimilarityMetric::Indel => indel_ratio(a, b),
        SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(a, b),
        SimilarityMetric::JaroWinkler => strsim::jaro_winkler(a, b),
    }
}

/// Edit ratio under insertions and deletions: `2 * LCS / (len_a + len_b)`
///
/// "midnight city" vs "midnite city" scores 0.88; unrelated titles land
/// well below 0.5.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();

    if total == 0 {
        return 1.0;
    }

    2.0 * longest_common_subsequence(&a, &b) as f64 / total as f64
}

/// Length of the longest common subsequence (two-row DP)
fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
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
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Length pre-filter: `true` when the lengths differ by more than
/// `max_ratio` of the longer one, so the pair cannot plausibly match
pub fn lengths_too_different(len_a: usize, len_b: usize, max_ratio: f64) -> bool {
    let longer = len_a.max(len_b);
    if longer == 0 {
        return false;
    }
    len_a.abs_diff(len_b) as f64 > max_ratio * longer as f64
}
