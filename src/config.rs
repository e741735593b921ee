//! TOML configuration.
//!
//! Every section has defaults, so an empty file is a valid configuration.
//! The provider API key is never read from the file: `provider.api_key_env`
//! names the environment variable that holds it.
//!
//! ```toml
//! [db]
//! path = "./data/docqa.sqlite"
//!
//! [chunking]
//! chunk_size = 1000
//!
//! [retrieval]
//! similarity_threshold = 0.6
//! top_k = 5
//!
//! [provider]
//! kind = "gemini"
//! api_key_env = "GEMINI_API_KEY"
//! timeout_secs = 60
//!
//! [[provider.embedding_models]]
//! model = "text-embedding-004"
//! rpm = 1500
//!
//! [ingest]
//! upload_dir = "./data/uploads"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//! ```

use anyhow::{bail, Context, Result};
use docqa_core::chunk::DEFAULT_CHUNK_SIZE;
use docqa_core::retrieval::{RetrievalParams, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_K};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/docqa.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
        }
    }
}

impl RetrievalConfig {
    pub fn params(&self) -> RetrievalParams {
        RetrievalParams {
            similarity_threshold: self.similarity_threshold,
            top_k: self.top_k,
        }
    }
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// One backend model and its nominal rate limits.
///
/// Limits are documentation for operators choosing the order; they are not
/// enforced locally.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub model: String,
    /// Requests per minute.
    #[serde(default)]
    pub rpm: Option<u32>,
    /// Tokens per minute.
    #[serde(default)]
    pub tpm: Option<u64>,
    /// Requests per day.
    #[serde(default)]
    pub rpd: Option<u32>,
}

impl ModelSpec {
    pub fn new(model: &str, rpm: Option<u32>, tpm: Option<u64>, rpd: Option<u32>) -> Self {
        Self {
            model: model.to_string(),
            rpm,
            tpm,
            rpd,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// `"gemini"` or `"disabled"`.
    #[serde(default = "default_provider_kind")]
    pub kind: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound on a single backend call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Generation models in priority order.
    #[serde(default = "default_generation_models")]
    pub generation_models: Vec<ModelSpec>,
    /// Embedding models in priority order.
    #[serde(default = "default_embedding_models")]
    pub embedding_models: Vec<ModelSpec>,
    /// Preferred model for image descriptions.
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            generation_models: default_generation_models(),
            embedding_models: default_embedding_models(),
            vision_model: default_vision_model(),
        }
    }
}

fn default_provider_kind() -> String {
    "gemini".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_vision_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

/// Default generation failover order.
pub fn default_generation_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("gemini-2.5-flash", Some(1000), Some(4_000_000), Some(1500)),
        ModelSpec::new("gemini-2.5-flash-lite", Some(1000), Some(4_000_000), Some(1500)),
        ModelSpec::new("gemini-2.0-flash-exp", Some(10), Some(250_000), Some(50)),
        ModelSpec::new("gemini-1.5-flash", Some(15), Some(1_000_000), Some(200)),
        ModelSpec::new("gemini-1.5-pro", Some(10), Some(250_000), Some(50)),
    ]
}

/// Default embedding failover order.
pub fn default_embedding_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("text-embedding-004", Some(1500), Some(1_000_000), None),
        ModelSpec::new("text-embedding-003", None, None, None),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Files larger than this are rejected.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// In-flight embedding or image tasks per file.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Fetch `http(s)` image sources referenced by HTML documents.
    #[serde(default = "default_fetch_remote_images")]
    pub fetch_remote_images: bool,
    /// Where ingested files are stored.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            concurrency: default_concurrency(),
            fetch_remote_images: default_fetch_remote_images(),
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_concurrency() -> usize {
    4
}
fn default_fetch_remote_images() -> bool {
    true
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

/// Parse and validate a configuration string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Read, parse and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    if !(-1.0..=1.0).contains(&config.retrieval.similarity_threshold) {
        bail!("retrieval.similarity_threshold must be in [-1.0, 1.0]");
    }

    if config.ingest.concurrency == 0 {
        bail!("ingest.concurrency must be > 0");
    }

    match config.provider.kind.as_str() {
        "disabled" => {}
        "gemini" => {
            if config.provider.generation_models.is_empty() {
                bail!("provider.generation_models must not be empty");
            }
            if config.provider.embedding_models.is_empty() {
                bail!("provider.embedding_models must not be empty");
            }
            if config.provider.timeout_secs == 0 {
                bail!("provider.timeout_secs must be > 0");
            }
        }
        other => bail!(
            "Unknown provider kind: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    Ok(())
}
