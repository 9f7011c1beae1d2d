//! Chat model generator

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use clozify_core::RetryPolicy;
use tracing::{debug, instrument};

use crate::{
    error::{LlmError, Result},
    generate::ClozeGenerator,
    prompt::{chat_prompt, Speaker},
};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Settings for [`ChatGenerator`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// API key; `None` lets the OpenAI client read `OPENAI_API_KEY`
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 256,
        }
    }
}

/// Generates clozes with a few-shot primed chat model
///
/// The definition is not part of the conversation.
pub struct ChatGenerator {
    client: Client<OpenAIConfig>,
    config: ChatConfig,
    retry: RetryPolicy,
}

impl ChatGenerator {
    pub fn new(config: ChatConfig) -> Self {
        let mut openai = OpenAIConfig::new();
        if let Some(api_key) = &config.api_key {
            openai = openai.with_api_key(api_key);
        }
        Self {
            client: Client::with_config(openai),
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Chat request for `word`
    pub fn build_request(&self, word: &str) -> Result<CreateChatCompletionRequest> {
        let messages = chat_prompt(word)
            .into_iter()
            .map(|(speaker, content)| chat_message(speaker, content))
            .collect::<Result<Vec<_>>>()?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_completion_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))
    }

    async fn complete_once(&self, request: CreateChatCompletionRequest) -> Result<String> {
        let response = self.client.chat().create(request).await?;

        if let Some(usage) = &response.usage {
            debug!("Chat response received, total usage {}", usage.total_tokens);
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or(LlmError::EmptyResponse)
    }
}

fn chat_message(speaker: Speaker, content: String) -> Result<ChatCompletionRequestMessage> {
    let message = match speaker {
        Speaker::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?
            .into(),
        Speaker::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl ClozeGenerator for ChatGenerator {
    #[instrument(skip(self, _definition))]
    async fn generate(&self, word: &str, _definition: &str) -> Result<String> {
        let request = self.build_request(word)?;
        self.retry
            .run("chat completion", || self.complete_once(request.clone()))
            .await
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 256);
    }

    #[test]
    fn test_build_request() {
        let generator = ChatGenerator::new(ChatConfig {
            api_key: Some("test-key".into()),
            ..ChatConfig::default()
        });

        let request = generator.build_request("Hund").unwrap();

        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(request.messages.len(), 4);
        assert!(matches!(
            request.messages[2],
            ChatCompletionRequestMessage::Assistant(_)
        ));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_completion_tokens, Some(256));
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_generate_cloze() {
        let generator = ChatGenerator::new(ChatConfig::default());
        let line = generator.generate("einheimisch", "").await.unwrap();
        assert!(line.contains(','));
    }
}
