use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use common::error::AppError;
use tracing::debug;

/// Free-text completion service used to classify videos.
#[async_trait]
pub trait TaggingService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AppError>;
}

/// Chat completion against an OpenAI-compatible endpoint, one user message
/// per call.
pub struct OpenAiTaggingService {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiTaggingService {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TaggingService for OpenAiTaggingService {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessage::from(prompt).into()])
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LLMParsing("No content found in LLM response".into()))?;

        debug!(model = %self.model, chars = content.chars().count(), "Tagging reply received");
        Ok(content)
    }
}
