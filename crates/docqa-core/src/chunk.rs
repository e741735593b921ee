//! Fixed-width text chunker.
//!
//! Splits extracted document text into [`Chunk`]s of at most `chunk_size`
//! characters. There is no sentence or word awareness: a chunk boundary may
//! fall mid-word. Vector retrieval tolerates this, and the split is
//! deterministic and lossless, so concatenating the pieces reproduces the
//! input exactly.
//!
//! Sizes are counted in `char`s, never bytes, so multi-byte text is never
//! cut inside a code point.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::split_text;
//!
//! let text = "a".repeat(2500);
//! let pieces = split_text(&text, 1000);
//! let lens: Vec<usize> = pieces.iter().map(|p| p.chars().count()).collect();
//! assert_eq!(lens, vec![1000, 1000, 500]);
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, ChunkIndex};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Split `text` into consecutive slices of at most `max_chars` characters.
///
/// Empty input yields no slices. A `max_chars` of zero is treated as one.
pub fn split_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;

    for (pos, _) in text.char_indices() {
        if count == max_chars {
            pieces.push(&text[start..pos]);
            start = pos;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Build the text chunks for a document, indexed `0..N` in order.
///
/// Chunks are returned without embeddings; the ingestion pipeline fills
/// those in.
pub fn chunk_text(document_id: &str, text: &str, chunk_size: usize) -> Vec<Chunk> {
    split_text(text, chunk_size)
        .into_iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(document_id, ChunkIndex::Text(i), piece))
        .collect()
}

/// Create a single chunk with a fresh id and content hash.
pub fn make_chunk(document_id: &str, index: ChunkIndex, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash: content_hash(text),
        embedding: None,
        page_number: None,
    }
}

/// SHA-256 of the text, hex encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
