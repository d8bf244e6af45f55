//! Lexical overlap metrics over normalised word tokens

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

/// Smoothing numerator for n-gram orders with no matches
const BLEU_EPSILON: f64 = 0.1;
const BLEU_MAX_ORDER: usize = 4;

/// Lowercase and collapse whitespace runs to single spaces
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unicode word tokens of already normalised text
pub fn tokenize(text: &str) -> Vec<&str> {
    text.unicode_words().collect()
}

fn ngram_counts<'a>(tokens: &'a [&str], n: usize) -> HashMap<&'a [&'a str], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Clipped overlap count and total n-grams of the candidate
fn clipped_overlap(candidate: &[&str], reference: &[&str], n: usize) -> (usize, usize) {
    let cand = ngram_counts(candidate, n);
    let refs = ngram_counts(reference, n);
    let overlap = cand
        .iter()
        .map(|(gram, count)| (*count).min(refs.get(*gram).copied().unwrap_or(0)))
        .sum();
    (overlap, candidate.len().saturating_sub(n - 1))
}

/// Sentence-level BLEU with uniform 1..4-gram weights, brevity penalty and
/// epsilon smoothing for orders without matches. 0 when either side is empty
/// or no unigram matches.
pub fn bleu(candidate: &[&str], reference: &[&str]) -> f64 {
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }

    let mut log_sum = 0.0;
    for n in 1..=BLEU_MAX_ORDER {
        let (matches, total) = clipped_overlap(candidate, reference, n);
        if n == 1 && matches == 0 {
            return 0.0;
        }
        let denominator = total.max(1) as f64;
        let precision = if matches == 0 {
            BLEU_EPSILON / denominator
        } else {
            matches as f64 / denominator
        };
        log_sum += precision.ln() / BLEU_MAX_ORDER as f64;
    }

    let c = candidate.len() as f64;
    let r = reference.len() as f64;
    let brevity = if c > r { 1.0 } else { (1.0 - r / c).exp() };

    brevity * log_sum.exp()
}

fn f1(overlap: usize, candidate_total: usize, reference_total: usize) -> f64 {
    if overlap == 0 || candidate_total == 0 || reference_total == 0 {
        return 0.0;
    }
    let precision = overlap as f64 / candidate_total as f64;
    let recall = overlap as f64 / reference_total as f64;
    2.0 * precision * recall / (precision + recall)
}

/// ROUGE-N F1
pub fn rouge_n(candidate: &[&str], reference: &[&str], n: usize) -> f64 {
    let (overlap, candidate_total) = clipped_overlap(candidate, reference, n);
    let reference_total = reference.len().saturating_sub(n - 1);
    f1(overlap, candidate_total, reference_total)
}

/// ROUGE-L F1 over the token longest common subsequence
pub fn rouge_l(candidate: &[&str], reference: &[&str]) -> f64 {
    f1(lcs_len(candidate, reference), candidate.len(), reference.len())
}

fn lcs_len(a: &[&str], b: &[&str]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
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

    fn toks(s: &str) -> Vec<&str> {
        tokenize(s)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Revenue\n\tGREW   10% "), "revenue grew 10%");
    }

    #[test]
    fn test_identical_text_scores_one() {
        let t = toks("the company grew revenue by ten percent");
        assert!((bleu(&t, &t) - 1.0).abs() < 1e-9);
        assert!((rouge_n(&t, &t, 1) - 1.0).abs() < 1e-9);
        assert!((rouge_n(&t, &t, 2) - 1.0).abs() < 1e-9);
        assert!((rouge_l(&t, &t) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_text_scores_zero() {
        let a = toks("alpha beta gamma");
        let b = toks("delta epsilon zeta");
        assert_eq!(bleu(&a, &b), 0.0);
        assert_eq!(rouge_n(&a, &b, 1), 0.0);
        assert_eq!(rouge_l(&a, &b), 0.0);
    }

    #[test]
    fn test_empty_side_scores_zero() {
        let a = toks("alpha beta");
        assert_eq!(bleu(&a, &[]), 0.0);
        assert_eq!(bleu(&[], &a), 0.0);
        assert_eq!(rouge_l(&[], &a), 0.0);
    }

    #[test]
    fn test_rouge_values() {
        let cand = toks("the cat sat on the mat");
        let reference = toks("the cat lay on the mat");
        // 5 of 6 unigrams shared
        assert!((rouge_n(&cand, &reference, 1) - 5.0 / 6.0).abs() < 1e-9);
        // bigrams: the-cat, on-the, the-mat shared out of 5
        assert!((rouge_n(&cand, &reference, 2) - 3.0 / 5.0).abs() < 1e-9);
        assert!((rouge_l(&cand, &reference) - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_candidate_is_penalised() {
        let reference = toks("revenue grew ten percent in fiscal year twenty three");
        let short = toks("revenue grew");
        let full = toks("revenue grew ten percent in fiscal year twenty three");
        assert!(bleu(&short, &reference) < bleu(&full, &reference));
        assert!(bleu(&short, &reference) > 0.0);
    }

    #[test]
    fn test_lcs() {
        assert_eq!(lcs_len(&["a", "b", "c", "d"], &["a", "c", "d"]), 3);
        assert_eq!(lcs_len(&["a"], &["b"]), 0);
    }
}
