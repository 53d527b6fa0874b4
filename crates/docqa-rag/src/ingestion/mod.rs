//! Document ingestion pipeline with multi-format parsing

mod chunker;
mod parser;
mod pipeline;

pub use chunker::{chunk, TextChunker, TextWindow};
pub use parser::{FileParser, ParsedDocument};
pub use pipeline::{extract_blocking, IngestOutcome, IngestPipeline};
