//! Ingestion pipeline orchestration.
//!
//! Runs one uploaded file through extraction → storage copy → document
//! insert → chunking → embedding → image description:
//!
//! 1. Reject files with an unsupported extension or over the size limit.
//! 2. Extract text and images ([`Extractor`]). Parse failures have already
//!    degraded to placeholder text; only an unreadable file fails here.
//! 3. Copy the file into the upload directory and insert the [`Document`].
//! 4. Chunk the text and embed each chunk, up to `concurrency` calls in
//!    flight. Indexes are fixed before any call is made, so completion order
//!    never affects them. A chunk whose embedding fails is stored without one.
//! 5. For each image: describe it, embed `[IMAGE DESCRIPTION] + [CONTEXT]`,
//!    store the image row, and store the text as chunk `image_N` when the
//!    embedding succeeded. Image tasks run concurrently and a failure in one
//!    is logged without affecting the others.
//!
//! If storing the document or its text chunks fails, the document row and
//! the stored copy are removed again before the error is returned.
//!
//! A batch runs files one after another; each file gets its own result.

use anyhow::Context;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use docqa_core::chunk::{chunk_text, make_chunk};
use docqa_core::models::{ChunkIndex, Document, DocumentImage};
use docqa_core::store::Store;

use crate::config::IngestConfig;
use crate::context::RequestContext;
use crate::describe::ImageDescriber;
use crate::extract::{extension_of, is_supported_extension, ExtractedImage, Extraction, Extractor};
use crate::images::is_image_data_uri;
use crate::provider::EmbeddingProvider;

/// A file handed over by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the bytes can be read.
    pub path: PathBuf,
    /// The name the uploader gave the file.
    pub original_name: String,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }

    /// Use the file's own name as the original name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            original_name,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The file was refused before any processing.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Result of ingesting one file.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub document: Document,
    pub chunks: usize,
    pub embedded_chunks: usize,
    pub images: usize,
    pub image_chunks: usize,
}

/// Per-file outcome of a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub original_name: String,
    pub result: Result<Ingested, IngestError>,
}

pub struct Ingestor {
    store: Arc<dyn Store>,
    extractor: Extractor,
    embedder: EmbeddingProvider,
    describer: ImageDescriber,
    chunk_size: usize,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn Store>,
        extractor: Extractor,
        embedder: EmbeddingProvider,
        describer: ImageDescriber,
        chunk_size: usize,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            embedder,
            describer,
            chunk_size,
            config,
        }
    }

    /// Ingest each file in turn. One file's failure never stops the rest.
    pub async fn ingest_batch(&self, files: &[UploadedFile], ctx: &RequestContext) -> Vec<BatchItem> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = self.ingest_document(file, ctx).await;
            if let Err(e) = &result {
                tracing::error!(file = %file.original_name, error = %e, "ingestion failed");
            }
            results.push(BatchItem {
                original_name: file.original_name.clone(),
                result,
            });
        }
        results
    }

    pub async fn ingest_document(
        &self,
        file: &UploadedFile,
        ctx: &RequestContext,
    ) -> Result<Ingested, IngestError> {
        let ext = extension_of(&file.original_name);
        if !is_supported_extension(&ext) {
            return Err(IngestError::Rejected(format!(
                "Unsupported file type: {}",
                file.original_name
            )));
        }

        let metadata = tokio::fs::metadata(&file.path)
            .await
            .with_context(|| format!("Failed to read uploaded file: {}", file.path.display()))?;
        if metadata.len() > self.config.max_file_bytes {
            return Err(IngestError::Rejected(format!(
                "File too large: {} ({} bytes, limit {} bytes)",
                file.original_name,
                metadata.len(),
                self.config.max_file_bytes
            )));
        }

        let extraction = self
            .extractor
            .extract(&file.path, &file.original_name)
            .await?;

        let (stored_name, stored_path) = self.store_copy(&file.path, &ext).await?;

        let document = Document {
            id: Uuid::new_v4().to_string(),
            filename: stored_name,
            original_filename: file.original_name.clone(),
            file_type: ext.to_uppercase(),
            file_size: metadata.len(),
            file_path: stored_path.display().to_string(),
            uploaded_by: ctx.user_id().to_string(),
            upload_date: Utc::now(),
            text_content: (!extraction.text.is_empty()).then(|| extraction.text.clone()),
        };
        match self.persist(&document, extraction).await {
            Ok((chunks, embedded_chunks, images, image_chunks)) => {
                tracing::info!(
                    document_id = %document.id,
                    chunks,
                    embedded_chunks,
                    images,
                    image_chunks,
                    "document ingested"
                );
                Ok(Ingested {
                    document,
                    chunks,
                    embedded_chunks,
                    images,
                    image_chunks,
                })
            }
            Err(e) => {
                self.roll_back(&document.id, &stored_path).await;
                Err(e.into())
            }
        }
    }

    /// Insert the document, its text chunks and its images. Returns
    /// (chunks, embedded chunks, images, image chunks).
    async fn persist(
        &self,
        document: &Document,
        extraction: Extraction,
    ) -> anyhow::Result<(usize, usize, usize, usize)> {
        self.store.insert_document(document).await?;
        tracing::info!(
            document_id = %document.id,
            file = %document.original_filename,
            size = %document.display_size(),
            "document stored"
        );

        let (chunks, embedded_chunks) = self.embed_text(&document.id, &extraction.text).await?;
        let (images, image_chunks) = self.process_images(&document.id, extraction.images).await;
        Ok((chunks, embedded_chunks, images, image_chunks))
    }

    async fn roll_back(&self, document_id: &str, stored_path: &Path) {
        if let Err(e) = self.store.delete_document(document_id).await {
            tracing::error!(document_id, error = %e, "could not remove partially ingested document");
        }
        if let Err(e) = tokio::fs::remove_file(stored_path).await {
            tracing::warn!(document_id, path = %stored_path.display(), error = %e, "could not remove stored file");
        }
    }

    async fn store_copy(&self, source: &Path, ext: &str) -> anyhow::Result<(String, PathBuf)> {
        let dir = &self.config.upload_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create upload dir: {}", dir.display()))?;
        let name = format!("{}.{}", Uuid::new_v4(), ext);
        let dest = dir.join(&name);
        tokio::fs::copy(source, &dest)
            .await
            .with_context(|| format!("Failed to store uploaded file: {}", dest.display()))?;
        Ok((name, dest))
    }

    /// Chunk and embed `text`; returns (chunks stored, chunks with vectors).
    async fn embed_text(&self, document_id: &str, text: &str) -> anyhow::Result<(usize, usize)> {
        let chunks = chunk_text(document_id, text, self.chunk_size);
        if chunks.is_empty() {
            return Ok((0, 0));
        }

        let embedded: Vec<_> = stream::iter(chunks)
            .map(|mut chunk| async move {
                match self.embedder.embed(&chunk.text).await {
                    Ok(e) => chunk.embedding = Some(e.vector),
                    Err(err) => tracing::warn!(
                        document_id,
                        chunk_index = %chunk.chunk_index,
                        error = %err,
                        "chunk embedding failed, storing without vector"
                    ),
                }
                chunk
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut with_vectors = 0;
        for chunk in &embedded {
            self.store.insert_chunk(chunk).await?;
            if chunk.embedding.is_some() {
                with_vectors += 1;
            }
        }
        Ok((embedded.len(), with_vectors))
    }

    /// Returns (images stored, image chunks stored).
    async fn process_images(&self, document_id: &str, images: Vec<ExtractedImage>) -> (usize, usize) {
        let total = images.len();
        if total == 0 {
            return (0, 0);
        }

        let outcomes: Vec<Option<bool>> = stream::iter(images.into_iter().enumerate())
            .map(|(index, image)| async move {
                match self.process_image(document_id, index, image).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(document_id, image_index = index, error = %e, "image processing failed");
                        None
                    }
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let stored = outcomes.iter().filter(|o| o.is_some()).count();
        let chunked = outcomes.iter().filter(|o| **o == Some(true)).count();
        tracing::info!(document_id, total, stored, chunked, "images processed");
        (stored, chunked)
    }

    /// `Ok(None)` when skipped, `Ok(Some(chunk_written))` when stored.
    async fn process_image(
        &self,
        document_id: &str,
        index: usize,
        image: ExtractedImage,
    ) -> anyhow::Result<Option<bool>> {
        if !is_image_data_uri(&image.payload) {
            tracing::warn!(document_id, image_index = index, "skipping non-base64 image");
            return Ok(None);
        }

        let description = self.describer.describe(&image.payload).await;
        if ImageDescriber::is_fallback(&description) {
            tracing::warn!(document_id, image_index = index, "storing image with fallback description");
        }
        let description_text = format!(
            "[IMAGE DESCRIPTION]: {}\n[CONTEXT]: {}",
            description, image.context
        );

        let embedding = match self.embedder.embed(&description_text).await {
            Ok(e) => Some(e.vector),
            Err(e) => {
                tracing::warn!(document_id, image_index = index, error = %e, "image description embedding failed");
                None
            }
        };

        self.store
            .insert_image(&DocumentImage {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                payload: image.payload,
                image_index: index,
                ai_description: Some(description),
                image_context: Some(image.context),
                embedding: embedding.clone(),
                extracted_at: Utc::now(),
            })
            .await?;

        let Some(vector) = embedding else {
            return Ok(Some(false));
        };
        let mut chunk = make_chunk(document_id, ChunkIndex::Image(index), &description_text);
        chunk.embedding = Some(vector);
        self.store.insert_chunk(&chunk).await?;
        Ok(Some(true))
    }
}
