//! Citation extraction and linking
//!
//! Only chunks that were supplied to the model can be cited. Tags naming anything
//! else are ignored.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::types::{ScoredChunk, SourceRef};

/// Matches `[Source: filename]` and `[Source: filename, Chunk N]`
const CITATION_PATTERN: &str = r"\[Source:\s*([^\]]+?)(?:\s*,\s*Chunk\s*(\d+))?\s*\]";

/// Parses `[Source: ...]` tags out of generated text
#[derive(Debug, Clone)]
pub struct CitationParser {
    pattern: Regex,
}

impl CitationParser {
    /// Compile the citation pattern
    pub fn new() -> Result<Self> {
        let pattern = RegexBuilder::new(CITATION_PATTERN)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::internal(format!("citation pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Link citations in `answer` to supplied chunks, deduplicated, in first-mention order.
    ///
    /// A tag with a chunk number must name a supplied chunk exactly. A bare filename
    /// resolves to the best-scoring supplied chunk of that file.
    ///
    /// Tags name documents by their [`source_labels`], so same-named files resolve
    /// to the document the model was shown.
    pub fn extract(&self, answer: &str, supplied: &[ScoredChunk]) -> Vec<SourceRef> {
        let labels = source_labels(supplied);
        let mut citations: Vec<SourceRef> = Vec::new();

        for cap in self.pattern.captures_iter(answer) {
            let label = cap.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let chunk_index: Option<u32> = cap.get(2).and_then(|m| m.as_str().parse().ok());
            let mut named = supplied
                .iter()
                .zip(&labels)
                .filter(|(_, l)| same_label(l, label))
                .map(|(s, _)| s);

            let matched = match chunk_index {
                Some(index) => named.find(|s| s.chunk.chunk_index == index),
                None => named.fold(None, |best: Option<&ScoredChunk>, s| match best {
                    Some(b) if b.similarity >= s.similarity => Some(b),
                    _ => Some(s),
                }),
            };

            match matched {
                Some(scored) => {
                    if !citations.iter().any(|c| c.chunk_id == scored.chunk.id) {
                        citations.push(SourceRef::from_scored(scored));
                    }
                }
                None => tracing::debug!(tag = %&cap[0], "Ignoring citation of an unsupplied chunk"),
            }
        }

        citations
    }
}

/// How each supplied chunk's document is named in source tags.
///
/// The filename alone, or `filename #xxxxxxxx` (first 8 hex digits of the document
/// id) when different supplied documents share a filename.
pub fn source_labels(supplied: &[ScoredChunk]) -> Vec<String> {
    supplied
        .iter()
        .map(|s| {
            let shared = supplied.iter().any(|other| {
                other.chunk.document_id != s.chunk.document_id
                    && same_label(&other.chunk.filename, &s.chunk.filename)
            });
            if shared {
                let mut short_id = s.chunk.document_id.simple().to_string();
                short_id.truncate(8);
                format!("{} #{}", s.chunk.filename, short_id)
            } else {
                s.chunk.filename.clone()
            }
        })
        .collect()
}

fn same_label(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
