pub mod error;
pub mod extract;
mod ooxml;
pub mod pipeline;
pub mod splitter;

pub use error::DocumentError;
pub use extract::{
    document_from_upload, extract_text, extract_text_from_path, extract_upload, guess_mime,
};
pub use pipeline::IngestionPipeline;
pub use splitter::{SplitterConfig, TextSplitter};

/// Default maximum input size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
