//! Batch embedding of videos that were tagged but never stored.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        store::StorageManager,
        title_index::TitleIndexes,
        types::{video::Video, TitledRecord},
    },
    utils::embedding::EmbeddingService,
};
use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{artifacts, types::tagged_video::TaggedVideo};

/// Files processed concurrently.
pub const BACKFILL_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub total: usize,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Stored,
    Skipped,
    Failed,
}

pub struct VideoBackfill {
    db: Arc<SurrealDbClient>,
    storage: StorageManager,
    embedding: Arc<dyn EmbeddingService>,
    title_indexes: Arc<TitleIndexes>,
    workers: usize,
}

impl VideoBackfill {
    pub fn new(
        db: Arc<SurrealDbClient>,
        storage: StorageManager,
        embedding: Arc<dyn EmbeddingService>,
        title_indexes: Arc<TitleIndexes>,
    ) -> Self {
        Self {
            db,
            storage,
            embedding,
            title_indexes,
            workers: BACKFILL_WORKERS,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Stores every tagged video under `processed_transcripts/` that is not
    /// in the store yet. Only listing the directory can fail the run.
    #[instrument(skip_all, fields(workers = self.workers))]
    pub async fn run(&self) -> Result<BackfillSummary, AppError> {
        let files: Vec<String> = self
            .storage
            .list(Some(artifacts::PROCESSED_TRANSCRIPTS_DIR))
            .await?
            .into_iter()
            .map(|meta| meta.location.to_string())
            .filter(|location| location.ends_with(".json"))
            .collect();

        let total = files.len();
        info!(total, "Starting video backfill");

        let completed = AtomicUsize::new(0);
        let outcomes: Vec<FileOutcome> = stream::iter(files)
            .map(|location| {
                let completed = &completed;
                async move {
                    let outcome = self.process_file(&location).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                    info!(%location, ?outcome, "Backfill progress {done}/{total}");
                    outcome
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut summary = BackfillSummary {
            total,
            ..BackfillSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                FileOutcome::Stored => summary.stored = summary.stored.saturating_add(1),
                FileOutcome::Skipped => summary.skipped = summary.skipped.saturating_add(1),
                FileOutcome::Failed => summary.failed = summary.failed.saturating_add(1),
            }
        }

        info!(?summary, "Video backfill finished");
        Ok(summary)
    }

    async fn process_file(&self, location: &str) -> FileOutcome {
        match self.try_process_file(location).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%location, error = %err, "Backfill failed for file");
                FileOutcome::Failed
            }
        }
    }

    async fn try_process_file(&self, location: &str) -> Result<FileOutcome, AppError> {
        let raw = self.storage.get(location).await?;
        let tagged: TaggedVideo = serde_json::from_slice(&raw)?;

        if tagged.video_id.trim().is_empty() {
            warn!(%location, "Tagged video has no videoId");
            return Ok(FileOutcome::Failed);
        }
        if tagged.metadata.is_empty() {
            warn!(%location, video_id = %tagged.video_id, "Tagged video carries no tags");
            return Ok(FileOutcome::Failed);
        }

        if self.db.item_exists::<Video>(&tagged.video_id).await? {
            return Ok(FileOutcome::Skipped);
        }

        let searchable_text = tagged.searchable_text();
        let embedding = self.embedding.embed(&searchable_text).await?;
        let video = tagged.to_video(searchable_text, embedding);

        self.storage
            .put(
                &artifacts::formatted_json(&video.id),
                Bytes::from(video.archive_json()?),
            )
            .await?;
        self.db.store_item(video.clone()).await?;
        self.title_indexes.videos.upsert(&video).await;
        info!(key = %video.key(), "Backfilled video");

        Ok(FileOutcome::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::utils::embedding::EmbeddingProvider;
    use serde_json::json;
    use uuid::Uuid;

    const DIM: usize = 8;

    async fn setup() -> (VideoBackfill, Arc<SurrealDbClient>, StorageManager) {
        let db = Arc::new(
            SurrealDbClient::memory("backfill_ns", &Uuid::new_v4().to_string())
                .await
                .expect("in-memory surrealdb"),
        );
        let storage = StorageManager::memory();
        let backfill = VideoBackfill::new(
            Arc::clone(&db),
            storage.clone(),
            Arc::new(EmbeddingProvider::new_hashed(DIM)),
            Arc::new(TitleIndexes::new()),
        )
        .with_workers(2);
        (backfill, db, storage)
    }

    async fn stage(storage: &StorageManager, location: &str, value: &serde_json::Value) {
        storage
            .put(location, Bytes::from(value.to_string()))
            .await
            .expect("stage");
    }

    fn tagged(id: &str, title: &str) -> serde_json::Value {
        json!({
            "videoId": id,
            "videoTitle": title,
            "metadata": {
                "classification": { "primaryCategory": "Instructional", "activityType": "Yoga" },
                "contextualTags": { "intensity": "LowIntensity" }
            }
        })
    }

    #[tokio::test]
    async fn stores_new_skips_existing_and_counts_failures() {
        let (backfill, db, storage) = setup().await;
        stage(
            &storage,
            &artifacts::processed_transcript("aaaaaaaaaaa"),
            &tagged("aaaaaaaaaaa", "Sunrise Stretch"),
        )
        .await;
        stage(
            &storage,
            &artifacts::processed_transcript("bbbbbbbbbbb"),
            &tagged("bbbbbbbbbbb", "Evening Wind Down"),
        )
        .await;
        stage(
            &storage,
            &artifacts::processed_transcript("ccccccccccc"),
            &json!({ "videoTitle": "No id here", "metadata": {} }),
        )
        .await;
        stage(
            &storage,
            &artifacts::processed_transcript("ddddddddddd"),
            &json!({ "videoId": "ddddddddddd", "videoTitle": "Untagged", "metadata": {} }),
        )
        .await;
        storage
            .put(
                &format!("{}/notes.txt", artifacts::PROCESSED_TRANSCRIPTS_DIR),
                Bytes::from_static(b"ignored"),
            )
            .await
            .expect("stage");

        let first = backfill.run().await.expect("first run");
        assert_eq!(
            first,
            BackfillSummary { total: 4, stored: 2, skipped: 0, failed: 2 }
        );

        let stored: Option<Video> = db.get_item("aaaaaaaaaaa").await.expect("get");
        let stored = stored.expect("video stored");
        assert_eq!(stored.youtube_title, "Sunrise Stretch");
        assert_eq!(stored.embedding.len(), DIM);
        assert!(storage
            .exists(&artifacts::formatted_json("aaaaaaaaaaa"))
            .await
            .expect("exists"));

        let second = backfill.run().await.expect("second run");
        assert_eq!(second.stored, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.failed, 2);
        assert!(!db.item_exists::<Video>("ddddddddddd").await.expect("exists"));
    }

    #[tokio::test]
    async fn empty_directory_is_a_noop() {
        let (backfill, _db, _storage) = setup().await;
        assert_eq!(backfill.run().await.expect("run"), BackfillSummary::default());
    }
}
