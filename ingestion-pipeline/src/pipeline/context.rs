use common::storage::{db::SurrealDbClient, store::StorageManager};
use tracing::{error, info, warn};

use crate::{artifacts, types::tagged_video::TaggedVideo};

use super::{config::IngestionConfig, error::VideoIngestError, services::PipelineServices};

pub struct PipelineContext<'a> {
    pub video_id: String,
    pub db: &'a SurrealDbClient,
    pub storage: &'a StorageManager,
    pub pipeline_config: &'a IngestionConfig,
    pub services: &'a dyn PipelineServices,
    pub title: Option<String>,
    pub transcript: Option<String>,
    pub tagged: Option<TaggedVideo>,
    pub searchable_text: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        video_id: String,
        db: &'a SurrealDbClient,
        storage: &'a StorageManager,
        pipeline_config: &'a IngestionConfig,
        services: &'a dyn PipelineServices,
    ) -> Self {
        Self {
            video_id,
            db,
            storage,
            pipeline_config,
            services,
            title: None,
            transcript: None,
            tagged: None,
            searchable_text: None,
            embedding: None,
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn transcript(&self) -> Result<&str, VideoIngestError> {
        self.transcript.as_deref().ok_or(VideoIngestError::EmptyTranscript)
    }

    pub fn tagged(&self) -> Result<&TaggedVideo, VideoIngestError> {
        self.tagged.as_ref().ok_or(VideoIngestError::InvalidArtifact)
    }

    /// The one exit for failed runs: logs the reason and removes every file
    /// written for this video unless the reason says to leave them.
    pub async fn abort(&mut self, err: VideoIngestError) -> VideoIngestError {
        match &err {
            VideoIngestError::AlreadyExists(_) => {
                info!(video_id = %self.video_id, "Video already stored, skipping");
            }
            VideoIngestError::EmptyTranscript => {
                warn!(video_id = %self.video_id, "Empty transcript, video pipeline aborted");
            }
            _ => error!(
                video_id = %self.video_id,
                error = %err,
                "Video pipeline aborted"
            ),
        }

        if err.requires_cleanup() {
            let removed = artifacts::remove_video_artifacts(self.storage, &self.video_id).await;
            info!(video_id = %self.video_id, removed, "Cleaned up video artifacts");
        }

        err
    }
}
