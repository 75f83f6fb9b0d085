//! Generative response requester: sends a prompt to the language model
//! endpoint and returns its free-form text untouched.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use assure_common::config::AppConfig;
use assure_common::error::AppError;
use assure_common::types::Secret;

use crate::retry::RetryPolicy;

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    /// Controls response variance
    pub temperature: f32,
    /// Caps response length
    pub max_output_tokens: u32,
}

impl GenerationParams {
    pub fn new(model: impl Into<String>, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_output_tokens,
        }
    }
}

/// Produces free-form text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Client for the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Secret,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Secret,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            retry,
        })
    }

    pub fn from_config(config: &AppConfig, retry: RetryPolicy) -> Result<Self, AppError> {
        Self::new(
            config.gemini_api_url.clone(),
            config.gemini_api_key.clone(),
            config.http_timeout(),
            retry,
        )
    }

    async fn generate_once(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, AppError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, params.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
            },
        };

        tracing::debug!(
            model = %params.model,
            prompt_chars = prompt.len(),
            temperature = params.temperature,
            max_output_tokens = params.max_output_tokens,
            "Requesting generation"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Transport {
                source_name: "generation".to_string(),
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                source_name: "generation".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Unreadable response body: {}", e)))?;

        candidate_text(payload)
            .ok_or_else(|| AppError::Generation("Response contained no candidate text".to_string()))
    }
}

/// Concatenate the text parts of the first candidate that has any.
fn candidate_text(payload: GenerateResponse) -> Option<String> {
    payload
        .candidates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .unwrap_or_default()
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .find(|text| !text.is_empty())
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, AppError> {
        let text = self
            .retry
            .run("generation", || self.generate_once(prompt, params))
            .await
            .map_err(|e| match e {
                AppError::Generation(_) => e,
                other => AppError::Generation(other.to_string()),
            })?;

        tracing::debug!(model = %params.model, response_chars = text.len(), "Generation complete");
        Ok(text)
    }
}
