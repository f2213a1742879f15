//! Text extraction dispatched on MIME type.

use std::path::Path;

use super::{DocumentError, ooxml};
use crate::models::{Document, DocumentMetadata};

pub const PDF: &str = "application/pdf";
pub const PLAIN: &str = "text/plain";
pub const MARKDOWN: &str = "text/markdown";
pub const CSV: &str = "text/csv";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// `text/plain; charset=utf-8` -> `text/plain`.
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Guess a MIME type from the file extension.
#[must_use]
pub fn guess_mime(path: &Path) -> Option<String> {
    if let Some(mime) = mime_guess::from_path(path).first_raw() {
        return Some(mime.to_owned());
    }
    let is_markdown = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"));
    is_markdown.then(|| MARKDOWN.to_owned())
}

/// Extract plain text from `bytes` declared as `mime`.
///
/// # Errors
///
/// Returns `UnsupportedFormat` for types other than PDF, plain text, markdown,
/// CSV, DOCX and PPTX, or a parse error if the content does not match its type.
pub fn extract_text(bytes: &[u8], mime: &str) -> Result<String, DocumentError> {
    match essence(mime).as_str() {
        PDF => pdf_text(bytes),
        PLAIN | MARKDOWN | "text/x-markdown" => {
            String::from_utf8(bytes.to_vec()).map_err(|e| DocumentError::parse("text", e))
        }
        CSV => csv_text(bytes),
        DOCX => ooxml::docx_text(bytes),
        PPTX => ooxml::pptx_text(bytes),
        _ => Err(DocumentError::UnsupportedFormat(mime.to_owned())),
    }
}

#[cfg(feature = "pdf")]
fn pdf_text(bytes: &[u8]) -> Result<String, DocumentError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::Pdf(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_bytes: &[u8]) -> Result<String, DocumentError> {
    Err(DocumentError::UnsupportedFormat(PDF.to_owned()))
}

/// Fields joined by spaces, one line per record.
fn csv_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut out = String::new();
    for record in reader.records() {
        let record = record.map_err(|e| DocumentError::parse("csv", e))?;
        let fields: Vec<&str> = record.iter().collect();
        out.push_str(&fields.join(" "));
        out.push('\n');
    }
    Ok(out)
}

/// Read and extract a file, guessing its type from the extension when `mime` is absent.
///
/// # Errors
///
/// Returns an error if the type is unknown or unsupported, the file exceeds
/// `max_size`, or reading or parsing fails.
pub async fn extract_text_from_path(
    path: &Path,
    mime: Option<&str>,
    max_size: u64,
) -> Result<String, DocumentError> {
    let mime = match mime {
        Some(m) => m.to_owned(),
        None => guess_mime(path)
            .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))?,
    };

    let meta = tokio::fs::metadata(path).await?;
    if meta.len() > max_size {
        return Err(DocumentError::FileTooLarge(meta.len()));
    }
    let bytes = tokio::fs::read(path).await?;

    tracing::debug!(path = %path.display(), %mime, size = bytes.len(), "extracting text");
    let result = tokio::task::spawn_blocking(move || extract_text(&bytes, &mime))
        .await
        .map_err(|e| DocumentError::Io(std::io::Error::other(e)))?;
    if let Err(e) = &result {
        tracing::error!(path = %path.display(), error = %e, "text extraction failed");
    }
    result
}

/// Extract an uploaded payload by spilling it to a temporary file.
///
/// The temporary file is removed whether or not extraction succeeds.
///
/// # Errors
///
/// Same as [`extract_text_from_path`].
pub async fn extract_upload(
    bytes: &[u8],
    mime: &str,
    max_size: u64,
) -> Result<String, DocumentError> {
    extract_upload_in(&std::env::temp_dir(), bytes, mime, max_size).await
}

/// [`extract_upload`] with the temporary file created under `dir`.
pub(crate) async fn extract_upload_in(
    dir: &Path,
    bytes: &[u8],
    mime: &str,
    max_size: u64,
) -> Result<String, DocumentError> {
    let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if len > max_size {
        return Err(DocumentError::FileTooLarge(len));
    }
    let temp = tempfile::Builder::new()
        .prefix("docstore-upload")
        .tempfile_in(dir)?;
    tokio::fs::write(temp.path(), bytes).await?;
    tracing::info!(%mime, size = len, "extracting uploaded file");
    extract_text_from_path(temp.path(), Some(mime), max_size).await
}

/// # Errors
///
/// Same as [`extract_upload`].
pub async fn document_from_upload(
    bytes: &[u8],
    mime: &str,
    metadata: Option<DocumentMetadata>,
    max_size: u64,
) -> Result<Document, DocumentError> {
    let text = extract_upload(bytes, mime, max_size).await?;
    Ok(Document {
        id: None,
        text,
        metadata,
    })
}
