//! Core data models shared by ingestion, storage, and retrieval.
//!
//! These mirror the logical rows the retrieval pipeline depends on:
//! uploaded [`Document`]s, their [`Chunk`]s, and extracted
//! [`DocumentImage`]s. Persistence mechanics live in the store
//! implementations, not here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded source file and its extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Name of the file as stored on disk.
    pub filename: String,
    /// Name the uploader gave the file; used for citations.
    pub original_filename: String,
    /// Upper-cased extension without the dot (`PDF`, `DOCX`, ...).
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    pub file_path: String,
    pub uploaded_by: String,
    pub upload_date: DateTime<Utc>,
    /// Extracted plain text. `None` when nothing was extracted.
    pub text_content: Option<String>,
}

impl Document {
    /// Human-readable size, e.g. `"0.25 MB"`.
    pub fn display_size(&self) -> String {
        format!("{:.2} MB", self.file_size as f64 / 1024.0 / 1024.0)
    }
}

/// Position of a chunk within its document.
///
/// Text chunks are numbered in extraction order; chunks generated from an
/// image description carry the image's position instead. Persisted as the
/// strings `"3"` and `"image_3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChunkIndex {
    Text(usize),
    Image(usize),
}

const IMAGE_PREFIX: &str = "image_";

impl fmt::Display for ChunkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkIndex::Text(n) => write!(f, "{}", n),
            ChunkIndex::Image(n) => write!(f, "{}{}", IMAGE_PREFIX, n),
        }
    }
}

/// Error returned when a stored chunk index string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chunk index: {0:?}")]
pub struct ParseChunkIndexError(pub String);

impl FromStr for ChunkIndex {
    type Err = ParseChunkIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix(IMAGE_PREFIX) {
            Some(rest) => rest.parse().map(ChunkIndex::Image),
            None => s.parse().map(ChunkIndex::Text),
        };
        parsed.map_err(|_| ParseChunkIndexError(s.to_string()))
    }
}

impl Serialize for ChunkIndex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChunkIndex {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A bounded slice of a document's text, or an image description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: ChunkIndex,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    /// `None` when embedding generation failed for this chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub page_number: Option<u32>,
}

/// An image pulled out of a document, with its AI description.
///
/// `payload` is always an inline `data:<mime>;base64,<data>` URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentImage {
    pub id: String,
    pub document_id: String,
    pub payload: String,
    pub image_index: usize,
    pub ai_description: Option<String>,
    pub image_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub extracted_at: DateTime<Utc>,
}

/// A citation pointing back at the document a retrieved chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Position-based id, `source-0`, `source-1`, ...
    pub id: String,
    pub document_id: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub url: String,
}
