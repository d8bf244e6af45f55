//! Citation extraction from generated answers

use uuid::Uuid;

use crate::retrieval::RankedContext;
use crate::types::Citation;

/// Maximum excerpt length in chars, before the ellipsis
pub const EXCERPT_CHARS: usize = 200;

/// Derive citations by scanning the answer for each context's `[i]` label.
///
/// Labels are checked in rank order, so the result is a rank-ordered subset
/// of `contexts` regardless of where labels appear in the text. A label the
/// answer never mentions yields no citation.
pub fn extract_citations(answer: &str, contexts: &[RankedContext]) -> Vec<Citation> {
    contexts
        .iter()
        .enumerate()
        .filter_map(|(i, ctx)| {
            let label = i as u32 + 1;
            if !answer.contains(&format!("[{}]", label)) {
                return None;
            }
            Some(Citation {
                id: Uuid::new_v4(),
                answer_id: None,
                chunk_id: ctx.chunk_id,
                document_id: ctx.document_id,
                page_number: ctx.page_number,
                excerpt: truncate_excerpt(&ctx.text, EXCERPT_CHARS),
                relevance_score: ctx.score,
                citation_order: label,
            })
        })
        .collect()
}

/// First `max_chars` chars, with `...` appended when anything was cut
pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contexts(n: usize) -> Vec<RankedContext> {
        (0..n)
            .map(|i| RankedContext {
                rank: i as u32 + 1,
                chunk_id: Uuid::new_v4(),
                document_id: Uuid::new_v4(),
                vector_id: format!("v{}", i),
                text: format!("context {}", i + 1),
                page_number: Some(i as u32 + 1),
                chunk_index: i as u32,
                score: 0.9 - i as f32 * 0.1,
            })
            .collect()
    }

    #[test]
    fn test_citations_follow_rank_not_text_order() {
        let ctxs = contexts(3);
        let citations = extract_citations("Net income was $5M [3]. Revenue grew [1].", &ctxs);

        let orders: Vec<u32> = citations.iter().map(|c| c.citation_order).collect();
        assert_eq!(orders, vec![1, 3]);
        assert_eq!(citations[0].chunk_id, ctxs[0].chunk_id);
        assert_eq!(citations[1].chunk_id, ctxs[2].chunk_id);
        assert_eq!(citations[1].relevance_score, ctxs[2].score);
    }

    #[test]
    fn test_labels_beyond_supplied_contexts_ignored() {
        let citations = extract_citations("See [1] and [7].", &contexts(2));
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].citation_order, 1);
    }

    #[test]
    fn test_no_labels_no_citations() {
        assert!(extract_citations("Information not found in provided documents", &contexts(3)).is_empty());
        assert!(extract_citations("Anything [1]", &[]).is_empty());
    }

    #[test]
    fn test_every_citation_label_present() {
        let ctxs = contexts(12);
        let answer = "Points [2], [10] and [12].";
        for citation in extract_citations(answer, &ctxs) {
            assert!(answer.contains(&format!("[{}]", citation.citation_order)));
            assert!(citation.citation_order as usize <= ctxs.len());
        }
    }

    #[test]
    fn test_truncate_excerpt() {
        assert_eq!(truncate_excerpt("short", 200), "short");
        let long = "é".repeat(250);
        let excerpt = truncate_excerpt(&long, 200);
        assert_eq!(excerpt.chars().count(), 203);
        assert!(excerpt.ends_with("..."));
        assert_eq!(truncate_excerpt(&"a".repeat(200), 200), "a".repeat(200));
    }
}
