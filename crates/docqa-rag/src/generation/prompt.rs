//! Prompt templates for RAG generation and summarization

use crate::types::ScoredChunk;

use super::citation::source_labels;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from retrieved chunks, each tagged with its source
    pub fn build_context(chunks: &[ScoredChunk]) -> String {
        let labels = source_labels(chunks);
        chunks
            .iter()
            .zip(&labels)
            .map(|(scored, label)| {
                format!("{}:\n{}", scored.chunk.source_tag(label), scored.chunk.content.trim())
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    /// Build the full RAG prompt with strict grounding
    pub fn build_rag_prompt(question: &str, chunks: &[ScoredChunk], chat_history: &str) -> String {
        let history = if chat_history.trim().is_empty() {
            "(none)"
        } else {
            chat_history.trim()
        };

        format!(
            r#"You are a Document Q&A Assistant. You help users understand and answer questions about their uploaded documents.

RULES:
1. Base your answer ONLY on the document context below
2. Cite the source of every piece of information by copying the tag shown above it exactly, e.g. [Source: filename, Chunk N]
3. If the context does not contain enough information, say so honestly
4. NEVER use external knowledge or make guesses beyond what is stated
5. For questions unrelated to the documents, reply: "I can only help with questions about your uploaded documents."

DOCUMENT CONTEXT:
{context}

CONVERSATION HISTORY:
{history}

QUESTION: {question}

Answer using ONLY the document context above, with citations:"#,
            context = Self::build_context(chunks),
            history = history,
            question = question.trim()
        )
    }

    /// Build a summarization prompt
    pub fn build_summary_prompt(text: &str) -> String {
        format!(
            r#"You are a document summarization expert. Provide a clear, concise summary of the following document.
Structure your summary with:
1. **Overview** - What the document is about
2. **Key Points** - The most important information
3. **Conclusions** - Main takeaways

Document content:
{text}"#,
            text = text
        )
    }

    /// Build a prompt summarizing one section of a long document
    pub fn build_section_summary_prompt(text: &str, part: usize, total: usize) -> String {
        format!(
            r#"The following is part {part} of {total} of a longer document. Summarize the important facts, figures and conclusions it contains in a few sentences. Do not add anything that is not in the text.

Section:
{text}

Summary:"#,
            part = part,
            total = total,
            text = text
        )
    }
}
