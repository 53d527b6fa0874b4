//! Text extraction for uploaded documents

use crate::error::{Error, Result};
use crate::types::FileType;

/// Extracted text with format metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Resolved file type
    pub file_type: FileType,
    /// Extracted plain text
    pub content: String,
    /// Total pages (if applicable)
    pub total_pages: Option<u32>,
}

/// Multi-format text extractor
pub struct FileParser;

impl FileParser {
    /// Extract text from an uploaded file.
    ///
    /// The format comes from the declared MIME type when it is recognised, otherwise
    /// from the filename. Extraction that yields only whitespace is an error.
    pub fn extract_text(
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<ParsedDocument> {
        let file_type = FileType::detect(filename, content_type);

        let parsed = match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data)?,
            FileType::Docx => Self::parse_docx(filename, data)?,
            FileType::Txt | FileType::Markdown => Self::parse_text(data, file_type),
            FileType::Unknown => {
                let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
                return Err(Error::UnsupportedFormat(format!(
                    "'{}' (supported: .pdf, .docx, .txt, .md)",
                    if extension.is_empty() { filename } else { extension }
                )));
            }
        };

        if parsed.content.trim().is_empty() {
            return Err(Error::EmptyDocument(filename.to_string()));
        }

        tracing::debug!(
            filename,
            file_type = file_type.display_name(),
            chars = parsed.content.chars().count(),
            "Extracted text"
        );

        Ok(parsed)
    }

    #[cfg(feature = "pdf")]
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let content = match pdf_extract::extract_text_from_mem(data) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(filename, "pdf-extract failed: {}, trying fallback", e);
                Self::extract_pdf_text_fallback(filename, data)?
            }
        };

        let content = normalize_lines(&cleanup_pdf_text(&content));

        let total_pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(_) => None,
        };

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content,
            total_pages,
        })
    }

    #[cfg(not(feature = "pdf"))]
    fn parse_pdf(_filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFormat(
            "pdf (built without the `pdf` feature)".to_string(),
        ))
    }

    /// Page-by-page extraction straight from content streams
    #[cfg(feature = "pdf")]
    fn extract_pdf_text_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for (page_num, page_id) in doc.get_pages() {
            match doc.get_page_content(page_id) {
                Ok(content) => {
                    let text = text_from_content_stream(&content);
                    if !text.trim().is_empty() {
                        pages.push(text);
                    }
                }
                Err(e) => tracing::debug!("Could not get content for page {}: {}", page_num, e),
            }
        }

        if pages.is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(pages.join("\n"))
    }

    #[cfg(feature = "docx")]
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            }
        }

        Ok(ParsedDocument {
            file_type: FileType::Docx,
            content: paragraphs.join("\n"),
            total_pages: None,
        })
    }

    #[cfg(not(feature = "docx"))]
    fn parse_docx(_filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFormat(
            "docx (built without the `docx` feature)".to_string(),
        ))
    }

    fn parse_text(data: &[u8], file_type: FileType) -> ParsedDocument {
        ParsedDocument {
            file_type,
            content: String::from_utf8_lossy(data).replace('\r', ""),
            total_pages: None,
        }
    }
}

/// Replace typographic characters pdf-extract leaves behind with ASCII equivalents
fn cleanup_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\u{2010}' | '\u{2011}' | '\u{2013}' => out.push('-'),
            '\u{2014}' => out.push_str("--"),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2022}' => out.push_str("* "),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            other => out.push(other),
        }
    }
    out
}

/// Trim every line and drop blank ones
fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull string operands of `Tj`/`TJ` operators out of `BT ... ET` blocks
#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
fn text_from_content_stream(content: &[u8]) -> String {
    let content = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;

    for line in content.lines().map(str::trim) {
        match line {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                if !text.ends_with(' ') && !text.is_empty() {
                    text.push(' ');
                }
            }
            _ if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) => {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        text.push_str(
                            &line[start + 1..end]
                                .replace("\\(", "(")
                                .replace("\\)", ")")
                                .replace("\\\\", "\\"),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_extraction() {
        let parsed = FileParser::extract_text("notes.txt", None, b"line one\r\nline two").unwrap();
        assert_eq!(parsed.file_type, FileType::Txt);
        assert_eq!(parsed.content, "line one\nline two");
    }

    #[test]
    fn test_markdown_by_mime() {
        let parsed =
            FileParser::extract_text("README", Some("text/markdown"), b"# Title\n\nBody").unwrap();
        assert_eq!(parsed.file_type, FileType::Markdown);
    }

    #[test]
    fn test_unsupported_format() {
        let err = FileParser::extract_text("budget.xlsx", None, b"PK\x03\x04").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_whitespace_only_is_empty_document() {
        let err = FileParser::extract_text("blank.txt", None, b"  \n\t ").unwrap_err();
        assert!(matches!(err, Error::EmptyDocument(name) if name == "blank.txt"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_garbage_pdf_is_parse_error() {
        let err = FileParser::extract_text("broken.pdf", None, b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_garbage_docx_is_parse_error() {
        let err = FileParser::extract_text("broken.docx", None, b"not a zip").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_cleanup_pdf_text() {
        assert_eq!(cleanup_pdf_text("\u{FB01}nal \u{2014} \u{201C}ok\u{201D}\0"), "final -- \"ok\"");
        assert_eq!(normalize_lines("  a  \n\n   \n b"), "a\nb");
    }

    #[test]
    fn test_content_stream_text() {
        let stream = b"BT\n/F1 12 Tf\n(Hello \\(world\\)) Tj\nET\nBT\n(Second) Tj\nET";
        assert_eq!(text_from_content_stream(stream), "Hello (world) Second");
    }
}
