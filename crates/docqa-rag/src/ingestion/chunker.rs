//! Sliding-window text chunking with character offset tracking

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// A window of text cut from a larger string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    /// Window position (0-based)
    pub index: u32,
    /// First character of the window
    pub char_start: usize,
    /// One past the last character of the window
    pub char_end: usize,
    /// Window text
    pub text: String,
}

/// Split `text` into windows of `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextWindow>> {
    Ok(TextChunker::new(chunk_size, overlap)?.split(text))
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Overlap between windows in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
        }
        .validate()?;

        Ok(Self { chunk_size, overlap })
    }

    /// Create from config
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Distance between consecutive window starts
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split text into overlapping windows. Offsets count characters, not bytes.
    pub fn split(&self, text: &str) -> Vec<TextWindow> {
        // Byte offset of every char, plus the end of the string
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;

        let mut windows = Vec::new();
        let mut start = 0usize;
        let mut index = 0u32;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            windows.push(TextWindow {
                index,
                char_start: start,
                char_end: end,
                text: text[boundaries[start]..boundaries[end]].to_string(),
            });

            if end == total_chars {
                break;
            }
            start += self.step();
            index += 1;
        }

        windows
    }

    /// Chunk a document's extracted text
    pub fn chunk_document(&self, doc: &Document, text: &str) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .map(|window| {
                Chunk::new(
                    doc.id,
                    doc.filename.clone(),
                    window.index,
                    window.text,
                    window.char_start,
                    window.char_end,
                )
            })
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

impl From<TextChunker> for ChunkingConfig {
    fn from(chunker: TextChunker) -> Self {
        ChunkingConfig {
            chunk_size: chunker.chunk_size,
            chunk_overlap: chunker.overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::FileType;

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(matches!(chunk("abc", 10, 10), Err(Error::InvalidConfig(_))));
        assert!(matches!(chunk("abc", 10, 12), Err(Error::InvalidConfig(_))));
        assert!(matches!(chunk("abc", 0, 0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_text_has_no_windows() {
        assert!(chunk("", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_windows_slide_by_step() {
        let windows = chunk("abcdefghij", 4, 1).unwrap();
        let texts: Vec<&str> = windows.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);

        let windows = chunk("abcdefghijk", 4, 1).unwrap();
        let texts: Vec<&str> = windows.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij", "jk"]);
    }

    #[test]
    fn test_short_text_is_single_window() {
        let windows = chunk("short", 100, 10).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "short");
        assert_eq!((windows[0].char_start, windows[0].char_end), (0, 5));
    }

    #[test]
    fn test_coverage_and_step_across_parameters() {
        let text: String = (0..997).map(|i| char::from(b'a' + (i % 26) as u8)).collect();

        for chunk_size in [1usize, 2, 7, 50, 333, 997, 2000] {
            for overlap in [0usize, 1, 3, 49, 332] {
                if overlap >= chunk_size {
                    continue;
                }
                let windows = chunk(&text, chunk_size, overlap).unwrap();
                let step = chunk_size - overlap;

                assert_eq!(windows[0].char_start, 0);
                assert_eq!(windows.last().unwrap().char_end, text.len());
                for pair in windows.windows(2) {
                    assert_eq!(pair[1].char_start - pair[0].char_start, step);
                    // No gaps between consecutive windows
                    assert!(pair[1].char_start <= pair[0].char_end);
                }
                for w in &windows {
                    assert!(w.char_end - w.char_start <= chunk_size);
                    assert_eq!(w.text, &text[w.char_start..w.char_end]);
                }
            }
        }
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "héllo wörld ünïcode";
        let windows = chunk(text, 5, 2).unwrap();

        let rebuilt: String = windows
            .iter()
            .enumerate()
            .map(|(i, w)| {
                if i == 0 {
                    w.text.clone()
                } else {
                    w.text.chars().skip(2).collect()
                }
            })
            .collect();
        assert_eq!(rebuilt, text);
        assert!(windows.iter().all(|w| w.text.chars().count() <= 5));
    }

    #[test]
    fn test_chunk_document_carries_identity() {
        let doc = Document::new("policy.txt", FileType::Txt, "0123456789");
        let chunker = TextChunker::new(4, 0).unwrap();
        let chunks = chunker.chunk_document(&doc, &doc.raw_text);

        assert_eq!(chunks.len(), 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.document_id, doc.id);
            assert_eq!(c.filename, "policy.txt");
            assert_eq!(c.chunk_index, i as u32);
        }
        assert_eq!(chunks[2].content, "89");
        assert_eq!((chunks[2].char_start, chunks[2].char_end), (8, 10));
    }
}
