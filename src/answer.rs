//! Answer assembly and the question round trip.
//!
//! [`Assistant::answer_question`] embeds the question, retrieves the chunks
//! above the similarity threshold and hands them to the
//! [`AnswerAssembler`], which picks one of two prompts:
//!
//! - **grounded** when retrieval found context: the chunk texts are given
//!   to the model, which must answer from them and say so when they are
//!   insufficient;
//! - **ungrounded** when retrieval found nothing: the model is told no
//!   documentation matched and must suggest next steps instead of
//!   answering.
//!
//! Sources are cited only for chunks that were actually used, so an
//! ungrounded answer has none and is flagged with `used_fallback`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use docqa_core::models::{Document, Source};
use docqa_core::retrieval::{RetrievalEngine, RetrievedChunk};
use docqa_core::store::Store;

use crate::provider::{EmbeddingProvider, FailoverError, GenerationProvider};

/// Filename cited when a chunk's document no longer exists.
pub const FALLBACK_SOURCE_NAME: &str = "Documentation";

const PREAMBLE: &str = "You are a helpful documentation assistant.";

pub fn grounded_prompt(question: &str, context: &str) -> String {
    format!(
        "{PREAMBLE} Answer questions based on the provided documentation context. \
If the context doesn't contain relevant information, say so clearly. \
Format your responses in markdown for better readability.\n\n\
Context from documentation:\n{context}\n\n\
Question: {question}"
    )
}

pub fn ungrounded_prompt(question: &str) -> String {
    format!(
        "{PREAMBLE} The user asked a question but no relevant documentation was found \
in the knowledge base.\n\n\
Please politely inform the user that you don't have information about their question \
in the available documentation, and suggest they:\n\
1. Try rephrasing their question\n\
2. Check if the documentation has been uploaded\n\
3. Contact the admin if they believe relevant documents are missing\n\n\
Question: {question}"
    )
}

/// Chunk texts in rank order, separated by blank lines.
pub fn build_context(retrieved: &[RetrievedChunk]) -> String {
    retrieved
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Source>,
    /// No relevant context was found; the answer is the ungrounded reply.
    pub used_fallback: bool,
    pub model_used: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Model API quota exceeded. Please check your API key.")]
    QuotaExceeded(#[source] FailoverError),
    #[error("Failed to process message")]
    Failed(#[source] anyhow::Error),
}

impl AnswerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AnswerError::QuotaExceeded(_) => "quota_exceeded",
            AnswerError::Failed(_) => "internal",
        }
    }
}

impl From<FailoverError> for AnswerError {
    fn from(e: FailoverError) -> Self {
        if e.is_rate_limit() {
            AnswerError::QuotaExceeded(e)
        } else {
            AnswerError::Failed(e.into())
        }
    }
}

/// Builds the prompt, calls the generator and attaches citations.
pub struct AnswerAssembler {
    generator: GenerationProvider,
    store: Arc<dyn Store>,
}

impl AnswerAssembler {
    pub fn new(generator: GenerationProvider, store: Arc<dyn Store>) -> Self {
        Self { generator, store }
    }

    pub async fn answer(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
    ) -> Result<Answer, AnswerError> {
        let context = build_context(retrieved);
        let grounded = !retrieved.is_empty() && !context.trim().is_empty();

        let prompt = if grounded {
            grounded_prompt(question, &context)
        } else {
            ungrounded_prompt(question)
        };

        let generated = self.generator.generate(&prompt).await?;

        let sources = if grounded {
            self.sources(retrieved).await.map_err(AnswerError::Failed)?
        } else {
            Vec::new()
        };

        Ok(Answer {
            text: generated.text,
            sources,
            used_fallback: !grounded,
            model_used: generated.model_used,
        })
    }

    /// One source per retrieved chunk, in rank order.
    pub async fn sources(&self, retrieved: &[RetrievedChunk]) -> anyhow::Result<Vec<Source>> {
        let mut documents: HashMap<String, Option<Document>> = HashMap::new();
        let mut sources = Vec::with_capacity(retrieved.len());

        for (i, r) in retrieved.iter().enumerate() {
            let document_id = &r.chunk.document_id;
            if !documents.contains_key(document_id) {
                let doc = self.store.get_document(document_id).await?;
                documents.insert(document_id.clone(), doc);
            }
            let filename = documents
                .get(document_id)
                .and_then(|d| d.as_ref())
                .map(|d| d.original_filename.clone())
                .unwrap_or_else(|| FALLBACK_SOURCE_NAME.to_string());

            sources.push(Source {
                id: format!("source-{}", i),
                document_id: document_id.clone(),
                filename,
                page: r.chunk.page_number,
                url: format!("/api/documents/{}", document_id),
            });
        }
        Ok(sources)
    }
}

/// The full retrieval + generation round trip.
pub struct Assistant {
    embedder: EmbeddingProvider,
    retrieval: RetrievalEngine<Arc<dyn Store>>,
    assembler: AnswerAssembler,
}

impl Assistant {
    pub fn new(
        embedder: EmbeddingProvider,
        retrieval: RetrievalEngine<Arc<dyn Store>>,
        assembler: AnswerAssembler,
    ) -> Self {
        Self {
            embedder,
            retrieval,
            assembler,
        }
    }

    /// Embed `question` and return the ranked chunks above the threshold.
    pub async fn search(&self, question: &str) -> Result<Vec<RetrievedChunk>, AnswerError> {
        let query = self.embedder.embed(question).await?;
        let retrieved = self
            .retrieval
            .search(&query.vector)
            .await
            .map_err(AnswerError::Failed)?;
        tracing::info!(
            results = retrieved.len(),
            top_similarity = retrieved.first().map(|r| r.similarity),
            threshold = self.retrieval.params().similarity_threshold,
            "retrieval complete"
        );
        Ok(retrieved)
    }

    pub async fn answer_question(&self, question: &str) -> Result<Answer, AnswerError> {
        let retrieved = self.search(question).await?;
        let answer = self.assembler.answer(question, &retrieved).await?;
        tracing::info!(
            model = %answer.model_used,
            sources = answer.sources.len(),
            used_fallback = answer.used_fallback,
            "answer generated"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::*;
    use crate::provider::ProviderError;
    use chrono::Utc;
    use docqa_core::chunk::make_chunk;
    use docqa_core::models::ChunkIndex;
    use docqa_core::retrieval::RetrievalParams;
    use docqa_core::store::memory::InMemoryStore;
    use std::time::Duration;

    fn generator(backend: Arc<ScriptedBackend>) -> GenerationProvider {
        GenerationProvider::new(backend, specs(&["g1", "g2"]), Duration::from_secs(5))
    }

    fn retrieved(document_id: &str, text: &str, similarity: f32) -> RetrievedChunk {
        let mut chunk = make_chunk(document_id, ChunkIndex::Text(0), text);
        chunk.page_number = Some(3);
        RetrievedChunk { chunk, similarity }
    }

    async fn store_with_doc(id: &str, name: &str) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_document(&Document {
                id: id.into(),
                filename: "stored.pdf".into(),
                original_filename: name.into(),
                file_type: "PDF".into(),
                file_size: 10,
                file_path: "/tmp/stored.pdf".into(),
                uploaded_by: "u".into(),
                upload_date: Utc::now(),
                text_content: None,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn grounded_answer_cites_sources() {
        let backend = Arc::new(ScriptedBackend::new().with("g1", Reply::Text("30 days.".into())));
        let store = store_with_doc("d1", "Refunds.pdf").await;
        let assembler = AnswerAssembler::new(generator(backend.clone()), store);

        let chunks = vec![
            retrieved("d1", "Refund policy is 30 days", 0.9),
            retrieved("gone", "Orphaned chunk", 0.7),
        ];
        let answer = assembler.answer("What is the refund policy?", &chunks).await.unwrap();

        assert_eq!(answer.text, "30 days.");
        assert!(!answer.used_fallback);
        assert_eq!(answer.model_used, "g1");
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].id, "source-0");
        assert_eq!(answer.sources[0].filename, "Refunds.pdf");
        assert_eq!(answer.sources[0].page, Some(3));
        assert_eq!(answer.sources[0].url, "/api/documents/d1");
        assert_eq!(answer.sources[1].filename, FALLBACK_SOURCE_NAME);

        let prompt = backend.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Context from documentation:\nRefund policy is 30 days\n\nOrphaned chunk"));
        assert!(prompt.ends_with("Question: What is the refund policy?"));
    }

    #[tokio::test]
    async fn empty_retrieval_uses_ungrounded_prompt() {
        let backend = Arc::new(
            ScriptedBackend::new().with("g1", Reply::Text("No documentation found.".into())),
        );
        let assembler =
            AnswerAssembler::new(generator(backend.clone()), Arc::new(InMemoryStore::new()));
        let answer = assembler.answer("What is X?", &[]).await.unwrap();

        assert!(answer.used_fallback);
        assert!(answer.sources.is_empty());
        let prompt = backend.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("no relevant documentation was found"));
        assert!(prompt.contains("1. Try rephrasing their question"));
        assert!(!prompt.contains("Context from documentation"));
    }

    #[tokio::test]
    async fn exhausted_rate_limits_map_to_quota_exceeded() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with("g1", rate_limited())
                .with("g2", rate_limited()),
        );
        let assembler = AnswerAssembler::new(generator(backend), Arc::new(InMemoryStore::new()));
        let err = assembler.answer("q", &[]).await.unwrap_err();
        assert!(matches!(err, AnswerError::QuotaExceeded(_)));
        assert_eq!(err.code(), "quota_exceeded");
    }

    #[tokio::test]
    async fn other_failures_map_to_generic_error() {
        let backend = Arc::new(
            ScriptedBackend::new().with("g1", Reply::Fail(ProviderError::new(Some(500), "boom"))),
        );
        let assembler = AnswerAssembler::new(generator(backend), Arc::new(InMemoryStore::new()));
        let err = assembler.answer("q", &[]).await.unwrap_err();
        assert_eq!(err.code(), "internal");
        assert_eq!(err.to_string(), "Failed to process message");
    }

    #[tokio::test]
    async fn round_trip_without_matches_is_flagged() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with("e1", Reply::Embedding(vec![0.0, 1.0]))
                .with("g1", Reply::Text("Sorry, nothing found.".into())),
        );
        let store = store_with_doc("d1", "a.pdf").await;
        let mut chunk = make_chunk("d1", ChunkIndex::Text(0), "unrelated");
        chunk.embedding = Some(vec![1.0, 0.0]);
        store.insert_chunk(&chunk).await.unwrap();

        let store: Arc<dyn Store> = store;
        let assistant = Assistant::new(
            EmbeddingProvider::new(backend.clone(), specs(&["e1"]), Duration::from_secs(5)),
            RetrievalEngine::new(store.clone(), RetrievalParams::default()),
            AnswerAssembler::new(generator(backend), store),
        );
        let answer = assistant.answer_question("anything?").await.unwrap();
        assert!(answer.used_fallback);
        assert!(answer.sources.is_empty());
    }
}
