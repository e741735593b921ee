//! Semantic retrieval over stored chunks.
//!
//! # Algorithm
//!
//! 1. Skip chunks that have no embedding.
//! 2. Score each remaining chunk by cosine similarity to the query vector.
//! 3. Drop chunks scoring below `similarity_threshold` (default `0.6`).
//! 4. Sort by similarity, descending. Ties keep input order.
//! 5. Truncate to `top_k` (default `5`).
//!
//! Similarity is computed against every stored chunk on every query. That
//! is O(N) per query and intended for a per-tenant document set, not a large
//! corpus.
//!
//! An empty result is a valid outcome meaning "no relevant context". The
//! answer layer switches prompt strategy on it rather than failing.

use anyhow::Result;
use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::models::Chunk;
use crate::store::Store;

/// Default minimum similarity for a chunk to count as relevant.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.6;
/// Default number of chunks returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    pub similarity_threshold: f32,
    pub top_k: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// A chunk that passed the threshold, with its score.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Score, filter, rank and truncate `chunks` against `query_vec`.
///
/// Pure function over an in-memory slice; [`RetrievalEngine::search`] feeds
/// it the store's current chunk set.
pub fn rank_chunks(
    query_vec: &[f32],
    chunks: Vec<Chunk>,
    params: &RetrievalParams,
) -> Vec<RetrievedChunk> {
    let mut scored: Vec<RetrievedChunk> = chunks
        .into_iter()
        .filter_map(|chunk| {
            let similarity = cosine_similarity(query_vec, chunk.embedding.as_deref()?);
            (similarity >= params.similarity_threshold)
                .then_some(RetrievedChunk { chunk, similarity })
        })
        .collect();

    // sort_by is stable, so equal scores keep input order
    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(params.top_k);
    scored
}

/// Retrieval engine bound to a [`Store`].
pub struct RetrievalEngine<S> {
    store: S,
    params: RetrievalParams,
}

impl<S: Store> RetrievalEngine<S> {
    pub fn new(store: S, params: RetrievalParams) -> Self {
        Self { store, params }
    }

    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }

    /// Rank every stored chunk against `query_vec`.
    pub async fn search(&self, query_vec: &[f32]) -> Result<Vec<RetrievedChunk>> {
        let chunks = self.store.list_chunks().await?;
        Ok(rank_chunks(query_vec, chunks, &self.params))
    }
}
