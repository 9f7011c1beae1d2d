//! Fine-tuned completion model generator

use std::time::Duration;

use async_trait::async_trait;
use clozify_core::RetryPolicy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::{LlmError, Result},
    generate::ClozeGenerator,
    prompt::{format_prompt, END_MARKER},
};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Settings for [`CompletionGenerator`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    /// API key; `None` falls back to `OPENAI_API_KEY`
    pub api_key: Option<String>,
    pub base_url: String,
    /// Identifier of the fine-tuned model
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: OPENAI_API_BASE.to_string(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 200,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: String,
    pub stop: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CompletionUsage {
    pub total_tokens: u32,
}

impl CompletionResponse {
    /// Trimmed text of the first choice
    pub fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Generates clozes with a completion model fine-tuned on
/// [`format_prompt`]/[`format_completion`](crate::format_completion) pairs
pub struct CompletionGenerator {
    client: Client,
    api_key: String,
    config: CompletionConfig,
    retry: RetryPolicy,
}

impl CompletionGenerator {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var("OPENAI_API_KEY")
                .map_err(|_| LlmError::config("OPENAI_API_KEY environment variable not set"))?,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build_request(&self, word: &str, definition: &str) -> CompletionRequest<'_> {
        CompletionRequest {
            model: &self.config.model,
            prompt: format_prompt(word, definition),
            stop: END_MARKER,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    async fn complete_once(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let url = format!("{}/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, body));
        }

        let response: CompletionResponse = response.json().await?;
        if let Some(usage) = &response.usage {
            debug!("Completion response received, total usage {}", usage.total_tokens);
        }
        response.into_text()
    }
}

#[async_trait]
impl ClozeGenerator for CompletionGenerator {
    #[instrument(skip(self))]
    async fn generate(&self, word: &str, definition: &str) -> Result<String> {
        let request = self.build_request(word, definition);
        self.retry
            .run("completion", || self.complete_once(&request))
            .await
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
