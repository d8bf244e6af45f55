//! Prompt templates for grounded answering and grading

use crate::retrieval::RankedContext;

/// System role for answer generation
pub const ANALYST_SYSTEM_PROMPT: &str = "You are a due diligence analyst.";

/// Phrase the model is told to use when the context has no answer
pub const NOT_FOUND_PHRASE: &str = "Information not found in provided documents";

/// Separator between contexts in grading prompts
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

pub const FAITHFULNESS_SYSTEM_PROMPT: &str = r#"Score answer faithfulness from 0.0 to 1.0.
1.0 = Fully supported by context
0.5 = Partially supported
0.0 = Unsupported claims
Return only the numeric score."#;

pub const RELEVANCY_SYSTEM_PROMPT: &str = r#"Score answer relevancy from 0.0 to 1.0.
1.0 = Directly answers question
0.5 = Partially relevant
0.0 = Not relevant
Return only the numeric score."#;

/// Prompt builder for questionnaire answers
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render contexts under their 1-based labels, in rank order
    pub fn build_context(contexts: &[RankedContext]) -> String {
        let mut context = String::new();
        for (i, ctx) in contexts.iter().enumerate() {
            let page = ctx
                .page_number
                .map(|p| format!("Page {}", p))
                .unwrap_or_else(|| "Page N/A".to_string());
            context.push_str(&format!("\n[{}] ({})\n{}\n", i + 1, page, ctx.text));
        }
        context
    }

    /// Build the grounded answering prompt
    pub fn build_answer_prompt(question: &str, contexts: &[RankedContext]) -> String {
        format!(
            r#"You are answering a due diligence questionnaire based on company documents.

Question: {question}

Available Context from Documents:
{context}

Instructions:
1. Answer the question based ONLY on the provided context
2. If the answer cannot be found in the context, say "{not_found}"
3. Include citation numbers [1], [2], etc. in your answer where you reference information
4. Be concise and factual
5. Do not make assumptions beyond what's stated in the documents

Answer:"#,
            question = question,
            context = Self::build_context(contexts),
            not_found = NOT_FOUND_PHRASE,
        )
    }

    pub fn build_faithfulness_prompt(answer: &str, contexts: &[RankedContext]) -> String {
        let joined = contexts
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        format!("Context:\n{}\n\nAnswer:\n{}", joined, answer)
    }

    pub fn build_relevancy_prompt(question: &str, answer: &str) -> String {
        format!("Question:\n{}\n\nAnswer:\n{}", question, answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx(rank: u32, text: &str, page: Option<u32>) -> RankedContext {
        RankedContext {
            rank,
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            vector_id: format!("v{}", rank),
            text: text.to_string(),
            page_number: page,
            chunk_index: 0,
            score: 0.8,
        }
    }

    #[test]
    fn test_contexts_labelled_in_rank_order() {
        let contexts = vec![ctx(1, "Revenue grew 10%.", Some(3)), ctx(2, "Net income $5M.", None)];
        let rendered = PromptBuilder::build_context(&contexts);

        assert!(rendered.contains("[1] (Page 3)\nRevenue grew 10%."));
        assert!(rendered.contains("[2] (Page N/A)\nNet income $5M."));
        assert!(rendered.find("[1]").unwrap() < rendered.find("[2]").unwrap());
    }

    #[test]
    fn test_answer_prompt_has_grounding_instructions() {
        let prompt = PromptBuilder::build_answer_prompt("What was revenue?", &[]);
        assert!(prompt.contains("Question: What was revenue?"));
        assert!(prompt.contains(NOT_FOUND_PHRASE));
        assert!(prompt.contains("ONLY on the provided context"));
    }

    #[test]
    fn test_faithfulness_prompt_joins_contexts() {
        let contexts = vec![ctx(1, "A", None), ctx(2, "B", None)];
        let prompt = PromptBuilder::build_faithfulness_prompt("ans", &contexts);
        assert_eq!(prompt, "Context:\nA\n---\nB\n\nAnswer:\nans");
    }
}
