//! Document management on top of a [`Store`].

use anyhow::Result;
use std::sync::Arc;

use docqa_core::models::{Chunk, Document, DocumentImage};
use docqa_core::store::Store;

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn Store>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All documents, newest first.
    pub async fn list(&self) -> Result<Vec<Document>> {
        self.store.list_documents().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        self.store.get_document(id).await
    }

    /// Text chunks in numeric order, then image chunks.
    pub async fn chunks(&self, id: &str) -> Result<Vec<Chunk>> {
        self.store.document_chunks(id).await
    }

    pub async fn images(&self, id: &str) -> Result<Vec<DocumentImage>> {
        self.store.document_images(id).await
    }

    /// Delete a document, its chunks and images, then its stored file.
    ///
    /// Returns `None` when no such document exists. Failing to remove the
    /// file is logged, not returned.
    pub async fn delete(&self, id: &str) -> Result<Option<Document>> {
        let Some(doc) = self.store.get_document(id).await? else {
            return Ok(None);
        };
        if !self.store.delete_document(id).await? {
            return Ok(None);
        }

        if let Err(e) = tokio::fs::remove_file(&doc.file_path).await {
            tracing::warn!(document_id = %id, path = %doc.file_path, error = %e, "could not remove stored file");
        }
        tracing::info!(document_id = %id, file = %doc.original_filename, "document deleted");
        Ok(Some(doc))
    }
}
