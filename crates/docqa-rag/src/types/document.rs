//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a MIME type, ignoring parameters such as `charset`
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Self::Pdf,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Self::Docx
            }
            "text/plain" => Self::Txt,
            "text/markdown" | "text/x-markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Resolve from the declared MIME type, falling back to the filename
    pub fn detect(filename: &str, content_type: Option<&str>) -> Self {
        let from_mime = content_type.map(Self::from_mime).unwrap_or(Self::Unknown);
        if from_mime.is_supported() {
            return from_mime;
        }

        let guessed = mime_guess::from_path(filename)
            .first()
            .map(|m| Self::from_mime(m.essence_str()))
            .unwrap_or(Self::Unknown);
        if guessed.is_supported() {
            return guessed;
        }

        let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        Self::from_extension(extension)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded by user
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the extracted text, used for duplicate detection
    pub content_hash: String,
    /// Extracted plain text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_text: String,
    /// Chunk IDs in sequence order
    pub chunk_ids: Vec<Uuid>,
    /// Total number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record for extracted text
    pub fn new(filename: impl Into<String>, file_type: FileType, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            file_type,
            content_hash: hash_content(&raw_text),
            raw_text,
            chunk_ids: Vec::new(),
            total_pages: None,
            ingested_at: chrono::Utc::now(),
        }
    }

    /// Number of chunks owned by this document
    pub fn total_chunks(&self) -> usize {
        self.chunk_ids.len()
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Source filename, used in prompt tags and citations
    pub filename: String,
    /// Position of this chunk within its document (0-based)
    pub chunk_index: u32,
    /// Text content
    pub content: String,
    /// Embedding vector, empty until computed
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Character range in the extracted text (end exclusive)
    pub char_start: usize,
    pub char_end: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        filename: impl Into<String>,
        chunk_index: u32,
        content: String,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            filename: filename.into(),
            chunk_index,
            content,
            embedding: Vec::new(),
            char_start,
            char_end,
        }
    }

    /// Source tag used in prompts and expected back in citations.
    ///
    /// `label` names the document; it is the filename unless another supplied
    /// document shares it.
    pub fn source_tag(&self, label: &str) -> String {
        format!("[Source: {}, Chunk {}]", label, self.chunk_index)
    }
}

/// Hash content for deduplication
pub fn hash_content(content: &str) -> String {
    use sha2::{Digest, Sha256};

    hex::encode(Sha256::digest(content.as_bytes()))
}
