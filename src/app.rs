//! Wiring: builds every service from a [`Config`].
//!
//! The store and the model backend are injected, so tests can assemble an
//! [`App`] over an in-memory store and a scripted backend.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use docqa_core::retrieval::RetrievalEngine;
use docqa_core::store::Store;

use crate::answer::{AnswerAssembler, Assistant};
use crate::config::Config;
use crate::db;
use crate::describe::ImageDescriber;
use crate::documents::DocumentService;
use crate::extract::Extractor;
use crate::ingest::Ingestor;
use crate::migrate::run_migrations;
use crate::provider::{create_backend, EmbeddingProvider, GenerationProvider, ModelBackend};
use crate::sqlite_store::SqliteStore;

pub struct App {
    pub config: Config,
    pub documents: DocumentService,
    pub ingestor: Ingestor,
    pub assistant: Assistant,
}

impl App {
    /// Open the configured SQLite database (creating the schema if needed)
    /// and the configured model backend.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        run_migrations(&pool).await?;
        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
        let backend = create_backend(&config.provider)?;
        Self::build(config, store, backend)
    }

    pub fn build(
        config: Config,
        store: Arc<dyn Store>,
        backend: Arc<dyn ModelBackend>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider.timeout_secs.max(1)))
            .build()?;

        let embedder = EmbeddingProvider::from_config(backend.clone(), &config.provider);
        let generator = GenerationProvider::from_config(backend, &config.provider);
        let describer = ImageDescriber::new(generator.clone(), config.provider.vision_model.clone());

        let ingestor = Ingestor::new(
            store.clone(),
            Extractor::new(http, config.ingest.fetch_remote_images),
            embedder.clone(),
            describer,
            config.chunking.chunk_size,
            config.ingest.clone(),
        );

        let assistant = Assistant::new(
            embedder,
            RetrievalEngine::new(store.clone(), config.retrieval.params()),
            AnswerAssembler::new(generator, store.clone()),
        );

        Ok(Self {
            documents: DocumentService::new(store),
            ingestor,
            assistant,
            config,
        })
    }
}
