//! Operations addressed by raw `table:id` keys.

use tracing::{info, warn};

use crate::{
    error::AppError,
    status::StatusMessage,
    storage::{
        db::SurrealDbClient,
        title_index::TitleIndexes,
        types::{book::Book, video::Video, ContentKind, Document},
    },
};

/// Deletes a comma-separated list of keys of one kind. Every key gets its own
/// status line; a bad key never stops the others.
pub async fn delete_keys(
    db: &SurrealDbClient,
    title_indexes: &TitleIndexes,
    raw_keys: &str,
    kind: ContentKind,
) -> Vec<StatusMessage> {
    let keys: Vec<&str> = raw_keys
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .collect();

    if keys.is_empty() {
        return vec![StatusMessage::warning("No keys provided.")];
    }

    let mut results = Vec::with_capacity(keys.len());
    let mut deleted_any = false;

    for key in keys {
        let message = match delete_one(db, key, kind).await {
            Ok(DeleteOutcome::Deleted) => {
                deleted_any = true;
                info!(%key, "Deleted record");
                StatusMessage::success(format!("'{key}': Successfully deleted."))
            }
            Ok(DeleteOutcome::Missing) => {
                StatusMessage::warning(format!("'{key}': Key does not exist."))
            }
            Ok(DeleteOutcome::WrongPrefix) => StatusMessage::error(format!(
                "'{key}': Key must start with `{}`",
                kind.key_prefix()
            )),
            Err(err) => {
                warn!(%key, error = %err, "Failed to delete record");
                StatusMessage::error(format!("'{key}': Error deleting key: {err}"))
            }
        };
        results.push(message);
    }

    if deleted_any {
        title_indexes.invalidate(kind).await;
    }

    results
}

enum DeleteOutcome {
    Deleted,
    Missing,
    WrongPrefix,
}

async fn delete_one(
    db: &SurrealDbClient,
    key: &str,
    kind: ContentKind,
) -> Result<DeleteOutcome, AppError> {
    let Some(id) = ContentKind::parse_key(key)
        .filter(|(parsed, _)| *parsed == kind)
        .map(|(_, id)| id)
    else {
        return Ok(DeleteOutcome::WrongPrefix);
    };

    let existed = match kind {
        ContentKind::Book => db.delete_item::<Book>(id).await?.is_some(),
        ContentKind::Video => db.delete_item::<Video>(id).await?.is_some(),
    };

    Ok(if existed {
        DeleteOutcome::Deleted
    } else {
        DeleteOutcome::Missing
    })
}

/// Loads the full document behind a `book:` or `video:` key.
pub async fn get_document(db: &SurrealDbClient, key: &str) -> Result<Option<Document>, AppError> {
    let (kind, id) = ContentKind::parse_key(key.trim())
        .ok_or_else(|| AppError::Validation(format!("Unrecognised key '{key}'")))?;

    Ok(match kind {
        ContentKind::Book => db.get_item::<Book>(id).await?.map(Document::Book),
        ContentKind::Video => db.get_item::<Video>(id).await?.map(Document::Video),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Severity;
    use crate::storage::types::{
        fields::FieldMap, video::VideoClassification, TitledRecord,
    };
    use uuid::Uuid;

    async fn memory_db() -> SurrealDbClient {
        SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("in-memory surrealdb")
    }

    fn stored_book() -> Book {
        let fields: FieldMap = [("book_title", "Atomic Habits")].into_iter().collect();
        Book::new(fields, "Atomic Habits".into(), vec![0.1])
    }

    #[tokio::test]
    async fn deletes_existing_and_reports_each_key() {
        let db = memory_db().await;
        let indexes = TitleIndexes::new();
        let book = stored_book();
        db.store_item(book.clone()).await.expect("store");

        let raw = format!("{}, book:missing_1, video:abcdefghijk", book.key());
        let results = delete_keys(&db, &indexes, &raw, ContentKind::Book).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].severity, Severity::Success);
        assert!(results[0].message.contains("Successfully deleted."));
        assert_eq!(results[1].severity, Severity::Warning);
        assert!(results[1].message.contains("'book:missing_1': Key does not exist."));
        assert_eq!(results[2].severity, Severity::Error);
        assert!(results[2].message.contains("Key must start with `book:`"));

        assert!(!db.item_exists::<Book>(&book.id).await.expect("exists"));
    }

    #[tokio::test]
    async fn empty_input_is_a_warning() {
        let db = memory_db().await;
        let results = delete_keys(&db, &TitleIndexes::new(), " , ", ContentKind::Video).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, Severity::Warning);
        assert!(results[0].message.ends_with("No keys provided."));
    }

    #[tokio::test]
    async fn deleting_invalidates_title_index() {
        let db = memory_db().await;
        let indexes = TitleIndexes::new();
        let book = stored_book();
        db.store_item(book.clone()).await.expect("store");

        assert!(indexes
            .lookup_key(&db, ContentKind::Book, "atomichabits")
            .await
            .expect("lookup")
            .is_some());

        delete_keys(&db, &indexes, &book.key(), ContentKind::Book).await;

        assert!(!indexes.books.is_built().await);
        assert!(indexes
            .lookup_key(&db, ContentKind::Book, "atomichabits")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn get_document_dispatches_on_prefix() {
        let db = memory_db().await;
        let video = Video::new(
            "dQw4w9WgXcQ",
            "Morning Yoga".into(),
            VideoClassification::default(),
            "Morning Yoga".into(),
            vec![0.5],
        );
        db.store_item(video.clone()).await.expect("store");

        let found = get_document(&db, "video:dQw4w9WgXcQ").await.expect("get");
        assert_eq!(found.map(|doc| doc.key()), Some(video.key()));

        assert!(get_document(&db, "book:nothing_here")
            .await
            .expect("get")
            .is_none());
        assert!(matches!(
            get_document(&db, "podcast:1").await,
            Err(AppError::Validation(_))
        ));
    }
}
