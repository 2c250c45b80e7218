//! Locations of the files the pipelines leave below the data directory.

use common::storage::store::StorageManager;
use tracing::{debug, warn};

pub const UPLOADED_BOOKS_DIR: &str = "uploaded_books";
pub const PROCESSED_BOOKS_DIR: &str = "processed_books";
pub const FINAL_BOOKS_CSV_DIR: &str = "final_books_csv";
pub const TRANSCRIPTS_DIR: &str = "transcripts";
pub const PROCESSED_TRANSCRIPTS_DIR: &str = "processed_transcripts";
pub const FORMATTED_JSONS_DIR: &str = "formatted_jsons";

pub fn uploaded_book(file_name: &str) -> String {
    format!("{UPLOADED_BOOKS_DIR}/{file_name}")
}

pub fn processed_book(uuid: &str) -> String {
    format!("{PROCESSED_BOOKS_DIR}/{uuid}.json")
}

pub fn final_books_csv(batch_id: &str) -> String {
    format!("{FINAL_BOOKS_CSV_DIR}/processed_books_{batch_id}.csv")
}

pub fn transcript(video_id: &str) -> String {
    format!("{TRANSCRIPTS_DIR}/{video_id}.txt")
}

pub fn processed_transcript(video_id: &str) -> String {
    format!("{PROCESSED_TRANSCRIPTS_DIR}/{video_id}.json")
}

pub fn formatted_json(video_id: &str) -> String {
    format!("{FORMATTED_JSONS_DIR}/{video_id}.json")
}

/// Every file a video run may have written for `video_id`.
pub fn video_artifacts(video_id: &str) -> [String; 3] {
    [
        transcript(video_id),
        processed_transcript(video_id),
        formatted_json(video_id),
    ]
}

/// Removes the transcript, tagged and final files of one video. Failures are
/// logged and skipped; returns how many files were removed.
pub async fn remove_video_artifacts(storage: &StorageManager, video_id: &str) -> usize {
    let mut removed = 0_usize;
    for location in video_artifacts(video_id) {
        match storage.delete(&location).await {
            Ok(true) => {
                removed = removed.saturating_add(1);
                debug!(%location, "Removed video artifact");
            }
            Ok(false) => {}
            Err(err) => warn!(%location, error = %err, "Failed to remove video artifact"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn removes_only_existing_video_files() {
        let storage = StorageManager::memory();
        storage
            .put(&transcript("dQw4w9WgXcQ"), Bytes::from_static(b"hello"))
            .await
            .expect("put transcript");
        storage
            .put(&transcript("abcdefghijk"), Bytes::from_static(b"keep"))
            .await
            .expect("put other transcript");

        assert_eq!(remove_video_artifacts(&storage, "dQw4w9WgXcQ").await, 1);
        assert!(!storage
            .exists(&transcript("dQw4w9WgXcQ"))
            .await
            .expect("exists"));
        assert!(storage
            .exists(&transcript("abcdefghijk"))
            .await
            .expect("exists"));
    }
}
