use uuid::Uuid;

use crate::models::{Document, DocumentChunk, DocumentChunkMetadata, DocumentWithChunks};

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sentence_aware: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            sentence_aware: true,
        }
    }
}

/// Cuts documents into chunks with ids `{document_id}_{index}`.
#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split `document`, assigning a fresh id if it has none.
    #[must_use]
    pub fn split(&self, mut document: Document) -> DocumentWithChunks {
        let doc_id = document
            .id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        let metadata = DocumentChunkMetadata::from_document(&doc_id, document.metadata.as_ref());

        let chunks = self
            .pieces(&document.text)
            .into_iter()
            .map(|piece| piece.trim().to_owned())
            .filter(|piece| !piece.is_empty())
            .enumerate()
            .map(|(i, text)| DocumentChunk {
                id: format!("{doc_id}_{i}"),
                text,
                metadata: metadata.clone(),
                embedding: None,
            })
            .collect();

        DocumentWithChunks { document, chunks }
    }

    fn pieces(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let size = self.config.chunk_size.max(1);
        if self.config.sentence_aware {
            merge_sentences(&split_sentences(text), size, self.config.chunk_overlap)
        } else {
            split_chars(text, size, self.config.chunk_overlap)
        }
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let next = chars.peek().copied();

        if c == '\n' && next == Some('\n') {
            current.push('\n');
            chars.next();
            if !current.trim().is_empty() {
                sentences.push(std::mem::take(&mut current));
            }
        } else if matches!(c, '.' | '?' | '!')
            && next == Some(' ')
            && !current.trim().is_empty()
        {
            sentences.push(std::mem::take(&mut current));
        }
    }

    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
}

/// Greedily pack sentences up to `chunk_size`, carrying trailing sentences
/// worth at most `chunk_overlap` bytes into the next chunk.
fn merge_sentences(sentences: &[String], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut window_start = 0;

    for (idx, sentence) in sentences.iter().enumerate() {
        if !current.is_empty() && current.len() + sentence.len() > chunk_size {
            chunks.push(std::mem::take(&mut current));

            let mut overlap_len = 0;
            let mut overlap_start = idx;
            for i in (window_start..idx).rev() {
                if overlap_len + sentences[i].len() > chunk_overlap {
                    break;
                }
                overlap_len += sentences[i].len();
                overlap_start = i;
            }
            for s in &sentences[overlap_start..idx] {
                current.push_str(s);
            }
            window_start = overlap_start;
        }
        current.push_str(sentence);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_chars(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
