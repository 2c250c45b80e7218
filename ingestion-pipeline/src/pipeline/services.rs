use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use common::{
    error::AppError,
    utils::{
        config::AppConfig,
        embedding::{EmbeddingError, EmbeddingService},
    },
};
use tracing::warn;
use url::Url;

use crate::{
    types::tagged_video::TaggedVideo,
    utils::{
        json_extraction::extract_json_payload,
        llm_instructions::build_tagging_prompt,
        tagging::{OpenAiTaggingService, TaggingService},
        transcript::{HttpTranscriptProvider, TranscriptError, TranscriptProvider},
        video_title::{TitleProvider, WatchPageTitleProvider},
    },
};

/// Everything the video pipeline needs from the outside world.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn fetch_title(&self, video_id: &str) -> String;

    async fn fetch_transcript(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<String, TranscriptError>;

    /// Prompts the tagging model and parses its JSON reply.
    async fn classify(
        &self,
        video_id: &str,
        video_title: &str,
        transcript: &str,
    ) -> Result<TaggedVideo, AppError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

pub struct DefaultPipelineServices {
    titles: Arc<dyn TitleProvider>,
    transcripts: Arc<dyn TranscriptProvider>,
    tagging: Arc<dyn TaggingService>,
    embedding: Arc<dyn EmbeddingService>,
}

impl DefaultPipelineServices {
    pub fn new(
        titles: Arc<dyn TitleProvider>,
        transcripts: Arc<dyn TranscriptProvider>,
        tagging: Arc<dyn TaggingService>,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            titles,
            transcripts,
            tagging,
            embedding,
        }
    }

    /// HTTP collaborators built from configuration. A malformed transcript
    /// service URL is a configuration error; a missing one only disables
    /// transcript fetching.
    pub fn from_config(
        config: &AppConfig,
        openai_client: Arc<Client<OpenAIConfig>>,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::new();
        let transcript_base = config
            .transcript_service_url
            .as_deref()
            .map(parse_base_url)
            .transpose()?;

        Ok(Self::new(
            Arc::new(WatchPageTitleProvider::new(http.clone())),
            Arc::new(HttpTranscriptProvider::new(http, transcript_base)),
            Arc::new(OpenAiTaggingService::new(
                openai_client,
                config.tagging_model.clone(),
            )),
            embedding,
        ))
    }
}

/// Base URLs are joined against, so they need a trailing slash.
fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash)
        .map_err(|err| AppError::Validation(format!("invalid transcript_service_url: {err}")))
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn fetch_title(&self, video_id: &str) -> String {
        self.titles.fetch_title(video_id).await
    }

    async fn fetch_transcript(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<String, TranscriptError> {
        self.transcripts.fetch_transcript(video_id, language).await
    }

    async fn classify(
        &self,
        video_id: &str,
        video_title: &str,
        transcript: &str,
    ) -> Result<TaggedVideo, AppError> {
        let prompt = build_tagging_prompt(video_id, video_title, transcript);
        let reply = self.tagging.complete(&prompt).await?;

        serde_json::from_str::<TaggedVideo>(extract_json_payload(&reply)).map_err(|err| {
            warn!(%video_id, error = %err, "Tagging reply is not valid JSON");
            AppError::LLMParsing(format!("Failed to parse tagging reply: {err}"))
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embedding.embed(text).await
    }
}
