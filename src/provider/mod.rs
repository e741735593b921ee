//! Model providers with rate-limit failover.
//!
//! A [`ModelBackend`] performs one call against one named model. The
//! [`EmbeddingProvider`] and [`GenerationProvider`] wrap a backend with a
//! prioritized model list and walk it as a small state machine:
//!
//! ```text
//!   trying model i ──success──────────────▶ done (value, model i)
//!        │ ├──empty result / rate limit──▶ trying model i+1
//!        │ └──any other error────────────▶ NonRetriable
//!        └──list (or max_attempts) used up▶ Exhausted
//! ```
//!
//! A preferred model, when given and present in the list, is tried first;
//! the rest follow in declared order. There is no backoff and no retry of
//! the same model: the retry budget is the length of the list.
//!
//! Every backend call is bounded by a timeout. A timeout counts as a
//! non-rate-limit failure. Dropping the returned future cancels the
//! in-flight request.

pub mod gemini;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ModelSpec, ProviderConfig};
use crate::images::InlineImage;

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// Rate-limit or quota failure, which failover may route around.
    pub fn is_rate_limit(&self) -> bool {
        if self.status == Some(429) {
            return true;
        }
        let msg = self.message.to_lowercase();
        ["quota", "rate limit", "resource exhausted", "429"]
            .iter()
            .any(|needle| msg.contains(needle))
    }
}

/// Terminal failure of a failover run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailoverError {
    /// Every candidate was rate limited or returned an empty result.
    #[error("All {capability} models failed. Last error: {last_error}")]
    Exhausted {
        capability: &'static str,
        last_error: String,
        /// At least one candidate failed with a rate-limit error.
        rate_limited: bool,
    },
    /// A candidate failed with an error switching models cannot fix.
    #[error(transparent)]
    NonRetriable(ProviderError),
    #[error("no {0} models configured")]
    NoModels(&'static str),
}

impl FailoverError {
    pub fn is_rate_limit(&self) -> bool {
        match self {
            FailoverError::Exhausted { rate_limited, .. } => *rate_limited,
            FailoverError::NonRetriable(e) => e.is_rate_limit(),
            FailoverError::NoModels(_) => false,
        }
    }
}

/// Per-call failover knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailoverOptions {
    pub preferred_model: Option<String>,
    /// Cap on the number of models tried. Defaults to the list length.
    pub max_attempts: Option<usize>,
}

impl FailoverOptions {
    pub fn preferring(model: impl Into<String>) -> Self {
        Self {
            preferred_model: Some(model.into()),
            max_attempts: None,
        }
    }
}

/// One call against one named model.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, ProviderError>;

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<String, ProviderError>;
}

/// Backend used when `provider.kind = "disabled"`. Every call fails
/// without being retried.
pub struct DisabledBackend;

#[async_trait]
impl ModelBackend for DisabledBackend {
    async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::message("model provider is disabled"))
    }

    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _images: &[InlineImage],
    ) -> Result<String, ProviderError> {
        Err(ProviderError::message("model provider is disabled"))
    }
}

/// Build the backend selected by configuration.
pub fn create_backend(config: &ProviderConfig) -> anyhow::Result<Arc<dyn ModelBackend>> {
    match config.kind.as_str() {
        "disabled" => Ok(Arc::new(DisabledBackend)),
        "gemini" => Ok(Arc::new(gemini::GeminiBackend::from_config(config)?)),
        other => anyhow::bail!("Unknown provider kind: {}", other),
    }
}

/// Candidate model names in try order, already capped.
pub fn candidate_order(models: &[ModelSpec], options: &FailoverOptions) -> Vec<String> {
    let mut order: Vec<String> = Vec::with_capacity(models.len());
    if let Some(preferred) = options.preferred_model.as_deref() {
        if models.iter().any(|m| m.model == preferred) {
            order.push(preferred.to_string());
        }
    }
    for spec in models {
        if !order.contains(&spec.model) {
            order.push(spec.model.clone());
        }
    }
    let limit = options.max_attempts.unwrap_or(order.len());
    order.truncate(limit);
    order
}

/// Walk `candidates` calling `call` until one yields a usable value.
///
/// `is_usable` decides whether a successful response counts; an unusable
/// one falls through to the next candidate without becoming the last error.
pub async fn run_failover<T, F, Fut>(
    capability: &'static str,
    candidates: &[String],
    is_usable: impl Fn(&T) -> bool,
    mut call: F,
) -> Result<(T, String), FailoverError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    if candidates.is_empty() {
        return Err(FailoverError::NoModels(capability));
    }

    let total = candidates.len();
    let mut last_error: Option<ProviderError> = None;
    let mut rate_limited = false;

    for (i, model) in candidates.iter().enumerate() {
        tracing::debug!(%model, attempt = i + 1, total, capability, "trying model");
        match call(model.clone()).await {
            Ok(value) if is_usable(&value) => {
                tracing::debug!(%model, capability, "model call succeeded");
                return Ok((value, model.clone()));
            }
            Ok(_) => {
                tracing::warn!(%model, capability, "model returned an empty result, trying next");
            }
            Err(e) if e.is_rate_limit() => {
                tracing::warn!(%model, capability, error = %e, "rate limited, trying next model");
                rate_limited = true;
                last_error = Some(e);
            }
            Err(e) => {
                tracing::error!(%model, capability, error = %e, "model call failed");
                return Err(FailoverError::NonRetriable(e));
            }
        }
    }

    Err(FailoverError::Exhausted {
        capability,
        last_error: last_error
            .map(|e| e.message)
            .unwrap_or_else(|| "Unknown error".to_string()),
        rate_limited,
    })
}

/// Apply `timeout` to one backend call.
async fn with_timeout<T>(
    timeout: Duration,
    model: &str,
    fut: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::message(format!(
            "request to model {} timed out after {}s",
            model,
            timeout.as_secs()
        ))),
    }
}

/// A successful embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub vector: Vec<f32>,
    pub model_used: String,
}

/// A successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub model_used: String,
}

/// Text embedding with failover across embedding models.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: Arc<dyn ModelBackend>,
    models: Vec<ModelSpec>,
    timeout: Duration,
}

impl EmbeddingProvider {
    pub fn new(backend: Arc<dyn ModelBackend>, models: Vec<ModelSpec>, timeout: Duration) -> Self {
        Self {
            backend,
            models,
            timeout,
        }
    }

    pub fn from_config(backend: Arc<dyn ModelBackend>, config: &ProviderConfig) -> Self {
        Self::new(
            backend,
            config.embedding_models.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub async fn embed(&self, text: &str) -> Result<Embedded, FailoverError> {
        self.embed_with(text, &FailoverOptions::default()).await
    }

    pub async fn embed_with(
        &self,
        text: &str,
        options: &FailoverOptions,
    ) -> Result<Embedded, FailoverError> {
        let candidates = candidate_order(&self.models, options);
        let (vector, model_used) = run_failover(
            "embedding",
            &candidates,
            |v: &Vec<f32>| !v.is_empty(),
            |model| {
                let backend = self.backend.clone();
                let timeout = self.timeout;
                async move { with_timeout(timeout, &model, backend.embed(&model, text)).await }
            },
        )
        .await?;
        Ok(Embedded { vector, model_used })
    }
}

/// Text generation with failover across generation models.
#[derive(Clone)]
pub struct GenerationProvider {
    backend: Arc<dyn ModelBackend>,
    models: Vec<ModelSpec>,
    timeout: Duration,
}

impl GenerationProvider {
    pub fn new(backend: Arc<dyn ModelBackend>, models: Vec<ModelSpec>, timeout: Duration) -> Self {
        Self {
            backend,
            models,
            timeout,
        }
    }

    pub fn from_config(backend: Arc<dyn ModelBackend>, config: &ProviderConfig) -> Self {
        Self::new(
            backend,
            config.generation_models.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub async fn generate(&self, prompt: &str) -> Result<Generated, FailoverError> {
        self.generate_with(prompt, &[], &FailoverOptions::default())
            .await
    }

    /// Generate from a prompt plus inline images.
    pub async fn generate_with(
        &self,
        prompt: &str,
        images: &[InlineImage],
        options: &FailoverOptions,
    ) -> Result<Generated, FailoverError> {
        let candidates = candidate_order(&self.models, options);
        let (text, model_used) = run_failover(
            "generation",
            &candidates,
            |t: &String| !t.trim().is_empty(),
            |model| {
                let backend = self.backend.clone();
                let timeout = self.timeout;
                async move {
                    with_timeout(timeout, &model, backend.generate(&model, prompt, images)).await
                }
            },
        )
        .await?;
        Ok(Generated { text, model_used })
    }
}
