//! Storage abstraction for docqa.
//!
//! The [`Store`] trait is the only shared mutable state in the system.
//! Rows are inserted whole and never updated in place; deleting a document
//! removes its chunks and images with it. Retrieval re-reads the chunk set
//! on every query, so concurrent ingestion and querying need no extra
//! locking: a query sees whatever chunks have committed so far.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, Document, DocumentImage};

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](Store::insert_document) | Persist a new document |
/// | [`insert_chunk`](Store::insert_chunk) | Persist one chunk (with optional vector) |
/// | [`insert_image`](Store::insert_image) | Persist an extracted image |
/// | [`get_document`](Store::get_document) | Look up a document by id |
/// | [`list_documents`](Store::list_documents) | All documents, newest first |
/// | [`list_chunks`](Store::list_chunks) | Every stored chunk, for similarity search |
/// | [`document_chunks`](Store::document_chunks) | One document's chunks in extraction order |
/// | [`document_images`](Store::document_images) | One document's images in order |
/// | [`delete_document`](Store::delete_document) | Delete a document with its chunks and images |
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<()>;

    async fn insert_image(&self, image: &DocumentImage) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    async fn list_documents(&self) -> Result<Vec<Document>>;

    async fn list_chunks(&self) -> Result<Vec<Chunk>>;

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>>;

    async fn document_images(&self, document_id: &str) -> Result<Vec<DocumentImage>>;

    /// Returns `true` if a document was deleted.
    async fn delete_document(&self, id: &str) -> Result<bool>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        (**self).insert_document(doc).await
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<()> {
        (**self).insert_chunk(chunk).await
    }

    async fn insert_image(&self, image: &DocumentImage) -> Result<()> {
        (**self).insert_image(image).await
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        (**self).get_document(id).await
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        (**self).list_documents().await
    }

    async fn list_chunks(&self) -> Result<Vec<Chunk>> {
        (**self).list_chunks().await
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        (**self).document_chunks(document_id).await
    }

    async fn document_images(&self, document_id: &str) -> Result<Vec<DocumentImage>> {
        (**self).document_images(document_id).await
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        (**self).delete_document(id).await
    }
}
