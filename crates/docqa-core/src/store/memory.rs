//! In-memory [`Store`] implementation for tests and embedded use.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Insertion order is
//! kept for chunks so `list_chunks` returns them in commit order, which is
//! what the SQLite store does too.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Chunk, Document, DocumentImage};

use super::Store;

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<Chunk>>,
    images: RwLock<Vec<DocumentImage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        write(&self.docs)?.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<()> {
        if !read(&self.docs)?.contains_key(&chunk.document_id) {
            anyhow::bail!("document not found: {}", chunk.document_id);
        }
        write(&self.chunks)?.push(chunk.clone());
        Ok(())
    }

    async fn insert_image(&self, image: &DocumentImage) -> Result<()> {
        if !read(&self.docs)?.contains_key(&image.document_id) {
            anyhow::bail!("document not found: {}", image.document_id);
        }
        write(&self.images)?.push(image.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(read(&self.docs)?.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = read(&self.docs)?.values().cloned().collect();
        docs.sort_by(|a, b| b.upload_date.cmp(&a.upload_date).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn list_chunks(&self) -> Result<Vec<Chunk>> {
        Ok(read(&self.chunks)?.clone())
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = read(&self.chunks)?
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn document_images(&self, document_id: &str) -> Result<Vec<DocumentImage>> {
        let mut images: Vec<DocumentImage> = read(&self.images)?
            .iter()
            .filter(|i| i.document_id == document_id)
            .cloned()
            .collect();
        images.sort_by_key(|i| i.image_index);
        Ok(images)
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let removed = write(&self.docs)?.remove(id).is_some();
        write(&self.chunks)?.retain(|c| c.document_id != id);
        write(&self.images)?.retain(|i| i.document_id != id);
        Ok(removed)
    }
}
