//! Prompt text and context assembly.

use docrag_core::types::DocumentChunk;

use crate::generator::{transcript, ChatMessage};

pub const NO_CONTEXT_ANSWER: &str =
    "I cannot find relevant information in the available documents to answer your question.";

pub const GROUNDED_SYSTEM_PROMPT: &str = "You are a legal document assistant.

Your responsibilities:
1. Answer questions ONLY based on the provided context from the documents
2. Maintain conversation continuity - refer to previous exchanges when relevant
3. If the answer is not in the context, clearly state: \"I cannot answer this question as it is not covered in the available documents.\"
4. Cite specific page numbers when providing answers
5. Be precise and accurate
6. Do not make assumptions or provide information outside the given context

Always maintain a professional and helpful tone.";

pub const HISTORY_SYSTEM_PROMPT: &str = "You are a legal document assistant. The user is asking a follow-up question about a previous topic in the conversation.

Your task:
1. Look at the conversation history to understand what was discussed
2. Answer the follow-up question based on information from previous responses
3. Be honest if you need more specific information
4. Maintain a helpful and professional tone";

pub const REWRITE_SYSTEM_PROMPT: &str =
    "You rewrite questions into standalone search queries. Reply with the rewritten question only.";

const NO_CONTEXT_INDICATORS: [&str; 5] =
    ["cannot answer", "not covered", "not mentioned", "no information", "not in the context"];

/// `[Source i - Page p]:` blocks, 1-based, in context order.
pub fn build_context(chunks: &[&DocumentChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[Source {} - Page {}]:\n{}", i + 1, c.metadata.page_number, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn grounded_user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context from legal documents:\n{context}\n\nQuestion: {question}\n\n\
         Please provide a precise answer based only on the context above. If the context doesn't \
         contain information to answer the question, clearly state that you cannot answer."
    )
}

pub fn standalone_question_prompt(history: &[ChatMessage], question: &str) -> String {
    format!(
        "Given this conversation:\n{}\n\nThe user's latest question is: \"{question}\"\n\n\
         Rewrite this question as a clear, standalone question that can be used to search a document database.\n\
         The rewritten question should:\n\
         1. Be self-contained (no pronouns or vague references)\n\
         2. Include the specific topic from the conversation\n\
         3. Be concise but specific\n\
         4. Be suitable for semantic search\n\n\
         Rewritten question:",
        transcript(history)
    )
}

pub fn reformulation_prompt(history: &[ChatMessage], query: &str) -> String {
    let conversation =
        if history.is_empty() { "(no earlier conversation)".to_string() } else { transcript(history) };
    format!(
        "Given this conversation:\n{conversation}\n\n\
         The search query \"{query}\" did not find sufficiently relevant passages.\n\
         Rewrite it as a clear, standalone question using the specific topic from the conversation, \
         suitable for searching a document database.\n\n\
         Rewritten question:"
    )
}

/// False when the answer itself says the context did not cover the question.
pub fn is_context_based(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    !NO_CONTEXT_INDICATORS.iter().any(|i| lower.contains(i))
}

/// Trim whitespace and surrounding quote characters from a model rewrite.
pub fn strip_quotes(text: &str) -> String {
    text.trim().trim_matches('"').trim_matches('\'').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrag_core::types::ChunkMetadata;

    #[test]
    fn context_blocks_are_numbered_from_one() {
        let meta = |page| ChunkMetadata {
            doc_id: "d".into(),
            filename: "f.txt".into(),
            page_number: page,
            chunk_index: 0,
            total_chunks: 1,
        };
        let a = DocumentChunk::new("d:0", "first", meta(3));
        let b = DocumentChunk::new("d:1", "second", meta(7));
        assert_eq!(build_context(&[&a, &b]), "[Source 1 - Page 3]:\nfirst\n\n[Source 2 - Page 7]:\nsecond");
    }

    #[test]
    fn refusals_are_not_context_based() {
        assert!(!is_context_based("I cannot answer this question as it is Not Covered."));
        assert!(is_context_based("The notice period is thirty days [Source 1]."));
    }

    #[test]
    fn quotes_are_stripped() {
        assert_eq!(strip_quotes("  \"What is the notice period?\"\n"), "What is the notice period?");
        assert_eq!(strip_quotes("'citizenship by descent'"), "citizenship by descent");
    }
}
