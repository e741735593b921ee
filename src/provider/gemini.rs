//! Gemini REST backend.
//!
//! Calls `POST {base_url}/models/{model}:generateContent` and
//! `POST {base_url}/models/{model}:embedContent` with the API key in the
//! `x-goog-api-key` header.
//!
//! The key is read from the configured environment variable on every call,
//! so a missing key is reported per call (as a non-retriable error) rather
//! than when the service starts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ModelBackend, ProviderError};
use crate::config::ProviderConfig;
use crate::images::InlineImage;

pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
}

impl GeminiBackend {
    pub fn new(http: reqwest::Client, base_url: &str, api_key_env: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key_env: api_key_env.to_string(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::new(http, &config.base_url, &config.api_key_env))
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::message(format!(
                    "{} environment variable not set",
                    self.api_key_env
                ))
            })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let key = self.api_key()?;
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(
                    e.status().map(|s| s.as_u16()),
                    format!("Gemini request failed: {}", e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), &body));
        }

        response.json::<R>().await.map_err(|e| {
            ProviderError::message(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn error_from_response(status: u16, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|env| match (env.error.status, env.error.message) {
            (Some(s), Some(m)) => format!("{} ({})", m, s),
            (None, Some(m)) => m,
            (Some(s), None) => s,
            (None, None) => body.to_string(),
        })
        .unwrap_or_else(|| body.trim().to_string());
    ProviderError::new(
        Some(status),
        format!("Gemini API error {}: {}", status, detail),
    )
}

fn generate_request<'a>(prompt: &'a str, images: &'a [InlineImage]) -> GenerateRequest<'a> {
    let mut parts = vec![Part::Text { text: prompt }];
    parts.extend(images.iter().map(|img| Part::Inline {
        inline_data: InlineData {
            mime_type: &img.mime_type,
            data: &img.data,
        },
    }));
    GenerateRequest {
        contents: vec![Content { parts }],
    }
}

fn response_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbedRequest {
            model: format!("models/{}", model),
            content: Content {
                parts: vec![Part::Text { text }],
            },
        };
        let response: EmbedResponse = self.post(&self.endpoint(model, "embedContent"), &body).await?;
        Ok(response.embedding.map(|e| e.values).unwrap_or_default())
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<String, ProviderError> {
        let body = generate_request(prompt, images);
        let response: GenerateResponse = self
            .post(&self.endpoint(model, "generateContent"), &body)
            .await?;
        Ok(response_text(response))
    }
}
