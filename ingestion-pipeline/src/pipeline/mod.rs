mod config;
mod context;
mod error;
mod services;
mod stages;
mod state;

pub use config::{IngestionConfig, IngestionTuning};
pub use error::VideoIngestError;
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_openai::{config::OpenAIConfig, Client};
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient, store::StorageManager, title_index::TitleIndexes,
        types::video::Video,
    },
    utils::{config::AppConfig, embedding::EmbeddingService, video_id::extract_video_id},
};
use tracing::{info, warn};

use self::{
    context::PipelineContext,
    stages::{embed, store, tag, transcribe},
    state::ready,
};

/// Runs one video through transcript, tagging, embedding and storage.
pub struct VideoIngestionPipeline {
    db: Arc<SurrealDbClient>,
    storage: StorageManager,
    title_indexes: Arc<TitleIndexes>,
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl VideoIngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        storage: StorageManager,
        title_indexes: Arc<TitleIndexes>,
        openai_client: Arc<Client<OpenAIConfig>>,
        config: &AppConfig,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Result<Self, AppError> {
        Self::new_with_config(
            db,
            storage,
            title_indexes,
            openai_client,
            config,
            embedding,
            IngestionConfig::with_language(config.transcript_language.clone()),
        )
    }

    pub fn new_with_config(
        db: Arc<SurrealDbClient>,
        storage: StorageManager,
        title_indexes: Arc<TitleIndexes>,
        openai_client: Arc<Client<OpenAIConfig>>,
        config: &AppConfig,
        embedding: Arc<dyn EmbeddingService>,
        pipeline_config: IngestionConfig,
    ) -> Result<Self, AppError> {
        let services = DefaultPipelineServices::from_config(config, openai_client, embedding)?;

        Self::with_services(
            db,
            storage,
            title_indexes,
            pipeline_config,
            Arc::new(services),
        )
    }

    pub fn with_services(
        db: Arc<SurrealDbClient>,
        storage: StorageManager,
        title_indexes: Arc<TitleIndexes>,
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            db,
            storage,
            title_indexes,
            pipeline_config,
            services,
        })
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Accepts a watch URL, short link or bare id. A video whose key is
    /// already stored short-circuits with [`VideoIngestError::AlreadyExists`]
    /// before any collaborator is called.
    #[tracing::instrument(skip_all, fields(input = %input))]
    pub async fn ingest_video(&self, input: &str) -> Result<Video, VideoIngestError> {
        let Some(video_id) = extract_video_id(input) else {
            warn!("No video id found in input");
            return Err(VideoIngestError::InvalidUrl);
        };

        let mut ctx = PipelineContext::new(
            video_id.clone(),
            self.db.as_ref(),
            &self.storage,
            &self.pipeline_config,
            self.services.as_ref(),
        );

        match self.db.item_exists::<Video>(&video_id).await {
            Ok(false) => {}
            Ok(true) => return Err(ctx.abort(VideoIngestError::AlreadyExists(video_id)).await),
            Err(err) => return Err(ctx.abort(err.into()).await),
        }

        let machine = ready();
        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = match transcribe(machine, &mut ctx).await {
            Ok(machine) => machine,
            Err(err) => return Err(ctx.abort(err).await),
        };
        let transcribe_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = match tag(machine, &mut ctx).await {
            Ok(machine) => machine,
            Err(err) => return Err(ctx.abort(err).await),
        };
        let tag_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = match embed(machine, &mut ctx).await {
            Ok(machine) => machine,
            Err(err) => return Err(ctx.abort(err).await),
        };
        let embed_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let (_machine, video) = match store(machine, &mut ctx).await {
            Ok(stored) => stored,
            Err(err) => return Err(ctx.abort(err).await),
        };
        let store_duration = stage_start.elapsed();

        self.title_indexes.videos.upsert(&video).await;

        info!(
            video_id = %video_id,
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            transcribe_ms = Self::duration_millis(transcribe_duration),
            tag_ms = Self::duration_millis(tag_duration),
            embed_ms = Self::duration_millis(embed_duration),
            store_ms = Self::duration_millis(store_duration),
            "video pipeline finished"
        );

        Ok(video)
    }
}
