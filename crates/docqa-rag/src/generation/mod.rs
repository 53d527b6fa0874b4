//! Prompt construction and citation handling

pub mod citation;
pub mod prompt;

pub use citation::{source_labels, CitationParser};
pub use prompt::PromptBuilder;
