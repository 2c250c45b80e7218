//! Tabular book ingestion: one CSV upload in, stored and archived books out.

use std::{fmt, path::PathBuf, sync::Arc};

use bytes::Bytes;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        store::StorageManager,
        types::{book::Book, fields::FieldMap, ContentKind, TitledRecord},
    },
    utils::{
        embedding::EmbeddingService,
        normalize::{build_searchable_text, to_field_key},
    },
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{artifacts, dedup::DuplicateResolver};

/// Column holding the title of a book after snake-casing.
pub const TITLE_COLUMN: &str = "book_title";

/// Columns concatenated, in this order, into the text that gets embedded.
pub const SEARCHABLE_COLUMNS: &[&str] = &[
    "book_title",
    "dimension",
    "sub_themes",
    "audience",
    "difficulty",
    "tone_and_style",
    "length",
    "user_goal_alignment",
    "challenge_addressed",
    "stage_of_wellness_journey",
    "activity_engagement_compatibility",
    "conversational_keywords",
    "emotional_behavioral_triggers",
    "personality_fit",
    "recommended_complementary_resources",
];

const FALLBACK_UPLOAD_NAME: &str = "upload.csv";

/// The shapes an uploaded CSV can arrive in. Resolved once, at the edge, into
/// a stored copy the pipeline reads from.
#[derive(Debug)]
pub enum UploadSource {
    /// A file already on disk. `file_name` overrides the name taken from the
    /// path, e.g. for temp files holding a multipart upload.
    Path {
        path: PathBuf,
        file_name: Option<String>,
    },
    Bytes { file_name: String, bytes: Bytes },
}

/// A CSV copied to `uploaded_books/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUpload {
    pub file_name: String,
    pub location: String,
}

impl UploadSource {
    pub async fn resolve(self, storage: &StorageManager) -> Result<ResolvedUpload, AppError> {
        let (file_name, bytes) = match self {
            Self::Path { path, file_name } => {
                let name = file_name
                    .or_else(|| {
                        path.file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                    })
                    .unwrap_or_default();
                let bytes = tokio::fs::read(&path).await?;
                (name, Bytes::from(bytes))
            }
            Self::Bytes { file_name, bytes } => (file_name, bytes),
        };

        let file_name = sanitize_file_name(&file_name);
        let location = artifacts::uploaded_book(&file_name);
        storage.put(&location, bytes).await?;
        info!(%location, "Book CSV uploaded");

        Ok(ResolvedUpload {
            file_name,
            location,
        })
    }
}

/// Keeps only the final path component so uploads cannot escape their
/// directory.
fn sanitize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_UPLOAD_NAME)
        .to_string()
}

/// Per-batch tally. `processed + failed + duplicates == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BookIngestionSummary {
    pub processed: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub total: usize,
}

impl fmt::Display for BookIngestionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "✅ Processed: {} | ❌ Failed: {} | ⏭️ Duplicates: {} | 📊 Total: {}",
            self.processed, self.failed, self.duplicates, self.total
        )
    }
}

#[derive(Debug, Clone)]
pub struct BookIngestionOutcome {
    pub books: Vec<Book>,
    pub summary: BookIngestionSummary,
}

enum RowOutcome {
    Stored(Box<Book>),
    Duplicate,
    Failed,
}

pub struct BookIngestionPipeline {
    db: Arc<SurrealDbClient>,
    storage: StorageManager,
    resolver: DuplicateResolver,
    embedding: Arc<dyn EmbeddingService>,
}

impl BookIngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        storage: StorageManager,
        resolver: DuplicateResolver,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            db,
            storage,
            resolver,
            embedding,
        }
    }

    /// Ingests every row of an uploaded CSV. Only an unreadable upload or
    /// header fails the call; everything else is counted per row.
    #[instrument(skip_all, fields(file = %upload.file_name))]
    pub async fn ingest(&self, upload: &ResolvedUpload) -> Result<BookIngestionOutcome, AppError> {
        let raw = self.storage.get(&upload.location).await?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(raw.as_ref());

        let headers: Vec<String> = reader.headers()?.iter().map(to_field_key).collect();

        let mut summary = BookIngestionSummary::default();
        let mut books = Vec::new();

        for (row_index, record) in reader.records().enumerate() {
            summary.total = summary.total.saturating_add(1);
            let row_number = row_index.saturating_add(1);

            let fields = match record {
                Ok(record) => row_fields(&headers, &record),
                Err(err) => {
                    warn!(row = row_number, error = %err, "Unreadable CSV row");
                    summary.failed = summary.failed.saturating_add(1);
                    continue;
                }
            };

            match self.ingest_row(row_number, fields).await {
                RowOutcome::Stored(book) => {
                    summary.processed = summary.processed.saturating_add(1);
                    books.push(*book);
                }
                RowOutcome::Duplicate => summary.duplicates = summary.duplicates.saturating_add(1),
                RowOutcome::Failed => summary.failed = summary.failed.saturating_add(1),
            }
        }

        if !books.is_empty() {
            if let Err(err) = self.archive_batch(&books).await {
                error!(error = %err, "Failed to write processed books CSV");
            }
        }

        info!(%summary, "Book ingestion finished");
        Ok(BookIngestionOutcome { books, summary })
    }

    async fn ingest_row(&self, row_number: usize, fields: FieldMap) -> RowOutcome {
        let title = fields.text(TITLE_COLUMN);
        let has_other_values = fields
            .iter()
            .any(|(key, value)| key != TITLE_COLUMN && !value.is_blank());

        if title.is_empty() || !has_other_values {
            warn!(row = row_number, "Incomplete book data");
            return RowOutcome::Failed;
        }

        let searchable_text = build_searchable_text(&fields, SEARCHABLE_COLUMNS);

        if self.resolver.is_duplicate(&title, ContentKind::Book).await {
            info!(row = row_number, %title, "Duplicate book skipped");
            return RowOutcome::Duplicate;
        }

        let embedding = match self.embedding.embed(&searchable_text).await {
            Ok(embedding) => embedding,
            Err(err) => {
                error!(row = row_number, %title, error = %err, "Failed to embed book");
                return RowOutcome::Failed;
            }
        };

        let book = Book::new(fields, searchable_text, embedding);

        if let Err(err) = self.db.store_item(book.clone()).await {
            error!(row = row_number, %title, error = %err, "Failed to store book");
            return RowOutcome::Failed;
        }
        self.resolver.title_indexes().books.upsert(&book).await;
        info!(row = row_number, key = %book.key(), "Saved book");

        if let Err(err) = self.archive_book(&book).await {
            warn!(key = %book.id, error = %err, "Failed to archive processed book JSON");
        }

        RowOutcome::Stored(Box::new(book))
    }

    async fn archive_book(&self, book: &Book) -> Result<(), AppError> {
        let location = artifacts::processed_book(&book.uuid);
        self.storage
            .put(&location, Bytes::from(book.archive_json()?))
            .await?;
        Ok(())
    }

    /// One CSV for the whole batch. The header is the first book's column
    /// set; columns other books add beyond it are dropped.
    async fn archive_batch(&self, books: &[Book]) -> Result<String, AppError> {
        let header: Vec<String> = books
            .first()
            .map(|book| {
                book.archive_columns()
                    .into_iter()
                    .map(|(key, _)| key)
                    .collect()
            })
            .unwrap_or_default();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&header)?;
        for book in books {
            let columns = book.archive_columns();
            let row = header.iter().map(|key| {
                columns
                    .iter()
                    .find(|(column, _)| column == key)
                    .map_or("", |(_, value)| value.as_str())
            });
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| AppError::InternalError(format!("failed to flush CSV: {err}")))?;

        let location = artifacts::final_books_csv(&Uuid::new_v4().to_string());
        self.storage.put(&location, Bytes::from(bytes)).await?;
        info!(%location, rows = books.len(), "Saved processed books CSV");
        Ok(location)
    }
}

/// Snake-cased header to trimmed value. Short rows leave trailing columns
/// empty; values beyond the header are ignored.
fn row_fields(headers: &[String], record: &csv::StringRecord) -> FieldMap {
    headers
        .iter()
        .enumerate()
        .map(|(index, key)| (key.as_str(), record.get(index).unwrap_or_default().trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{
        storage::title_index::TitleIndexes,
        utils::embedding::{EmbeddingError, EmbeddingProvider},
    };

    const DIM: usize = 8;

    struct FailingEmbedding;

    #[async_trait]
    impl EmbeddingService for FailingEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::EmptyResponse)
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    async fn setup(
        embedding: Arc<dyn EmbeddingService>,
    ) -> (BookIngestionPipeline, Arc<SurrealDbClient>, StorageManager) {
        let db = Arc::new(
            SurrealDbClient::memory("book_pipeline_ns", &Uuid::new_v4().to_string())
                .await
                .expect("in-memory surrealdb"),
        );
        db.ensure_initialized(DIM).await.expect("indexes");
        let storage = StorageManager::memory();
        let resolver = DuplicateResolver::new(Arc::clone(&db), Arc::new(TitleIndexes::new()));
        let pipeline = BookIngestionPipeline::new(Arc::clone(&db), storage.clone(), resolver, embedding);
        (pipeline, db, storage)
    }

    async fn upload(storage: &StorageManager, csv: &str) -> ResolvedUpload {
        UploadSource::Bytes {
            file_name: "books.csv".into(),
            bytes: Bytes::from(csv.to_string()),
        }
        .resolve(storage)
        .await
        .expect("resolve upload")
    }

    fn hashed() -> Arc<dyn EmbeddingService> {
        Arc::new(EmbeddingProvider::new_hashed(DIM))
    }

    fn key_shape_ok(id: &str) -> bool {
        let Some((slug, uuid)) = id.split_once('_') else {
            return false;
        };
        (1..=6).contains(&slug.len())
            && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && Uuid::parse_str(uuid).is_ok()
            && uuid.len() == 36
    }

    #[tokio::test]
    async fn stores_new_book_with_embedding() {
        let (pipeline, db, storage) = setup(hashed()).await;
        let resolved = upload(&storage, "Book Title,Dimension\nThe Four Agreements,Spiritual\n").await;

        let outcome = pipeline.ingest(&resolved).await.expect("ingest");

        assert_eq!(
            outcome.summary,
            BookIngestionSummary { processed: 1, failed: 0, duplicates: 0, total: 1 }
        );
        let book = outcome.books.first().expect("one book");
        assert!(key_shape_ok(&book.id), "unexpected key {}", book.id);
        assert!(book.id.starts_with("thefou_"));
        assert!(book.searchable_text.starts_with("The Four Agreements"));
        assert_eq!(book.embedding.len(), DIM);

        let stored: Option<Book> = db.get_item(&book.id).await.expect("get");
        assert!(stored.is_some());
        assert!(storage
            .exists(&artifacts::processed_book(&book.uuid))
            .await
            .expect("exists"));
    }

    #[tokio::test]
    async fn case_variant_title_is_a_duplicate() {
        let (pipeline, db, storage) = setup(hashed()).await;
        let resolved = upload(
            &storage,
            "Book Title,Dimension\nThe Four Agreements,Spiritual\nthe four agreements,Mental\n",
        )
        .await;

        let outcome = pipeline.ingest(&resolved).await.expect("ingest");

        assert_eq!(outcome.summary.processed, 1);
        assert_eq!(outcome.summary.duplicates, 1);
        let all: Vec<Book> = db.get_all_stored_items().await.expect("scan");
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_counts_as_failed_without_writes() {
        let (pipeline, db, storage) = setup(Arc::new(FailingEmbedding)).await;
        let resolved = upload(&storage, "Book Title,Dimension\nAtomic Habits,Physical\n").await;

        let outcome = pipeline.ingest(&resolved).await.expect("ingest");

        assert_eq!(outcome.summary.failed, 1);
        assert!(outcome.books.is_empty());
        let all: Vec<Book> = db.get_all_stored_items().await.expect("scan");
        assert!(all.is_empty());
        let archived = storage
            .list(Some(artifacts::FINAL_BOOKS_CSV_DIR))
            .await
            .expect("list");
        assert!(archived.is_empty());
    }

    #[tokio::test]
    async fn incomplete_rows_fail_and_counts_add_up() {
        let (pipeline, _db, storage) = setup(hashed()).await;
        let csv = "Book Title,Dimension,Audience\n\
                   ,Spiritual,Adults\n\
                   Lonely Title,,\n\
                   Deep Work,Mental\n\
                   Deep Work,Mental,Adults\n";
        let resolved = upload(&storage, csv).await;

        let outcome = pipeline.ingest(&resolved).await.expect("ingest");
        let summary = outcome.summary;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(
            summary.processed + summary.failed + summary.duplicates,
            summary.total
        );
        assert_eq!(
            summary.to_string(),
            "✅ Processed: 1 | ❌ Failed: 2 | ⏭️ Duplicates: 1 | 📊 Total: 4"
        );
    }

    #[tokio::test]
    async fn batch_csv_uses_first_record_header() {
        let (pipeline, _db, storage) = setup(hashed()).await;
        let resolved = upload(
            &storage,
            "Book Title,Dimension\nThe Four Agreements,Spiritual\nAtomic Habits,Physical\n",
        )
        .await;

        pipeline.ingest(&resolved).await.expect("ingest");

        let archived = storage
            .list(Some(artifacts::FINAL_BOOKS_CSV_DIR))
            .await
            .expect("list");
        assert_eq!(archived.len(), 1);
        let location = archived.first().expect("csv").location.to_string();
        let body = storage.get(&location).await.expect("get");
        let mut reader = csv::Reader::from_reader(body.as_ref());
        let header: Vec<String> = reader
            .headers()
            .expect("header")
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(
            header,
            vec![
                "uuid",
                "book_title",
                "dimension",
                "book_title_normalized",
                "searchable_text",
                "embedding"
            ]
        );
        assert_eq!(reader.records().count(), 2);
    }

    #[tokio::test]
    async fn upload_names_are_reduced_to_file_names() {
        let storage = StorageManager::memory();
        let resolved = UploadSource::Bytes {
            file_name: "../../etc/books.csv".into(),
            bytes: Bytes::from_static(b"Book Title\n"),
        }
        .resolve(&storage)
        .await
        .expect("resolve");

        assert_eq!(resolved.location, "uploaded_books/books.csv");
        assert_eq!(sanitize_file_name(""), FALLBACK_UPLOAD_NAME);
        assert_eq!(sanitize_file_name("dir\\x.csv"), "x.csv");
    }

    #[tokio::test]
    async fn path_uploads_are_copied() {
        let storage = StorageManager::memory();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.csv");
        tokio::fs::write(&path, "Book Title,Dimension\nX,Y\n")
            .await
            .expect("write");

        let resolved = UploadSource::Path { path, file_name: None }
            .resolve(&storage)
            .await
            .expect("resolve");

        assert_eq!(resolved.file_name, "catalog.csv");
        let copied = storage.get(&resolved.location).await.expect("get");
        assert_eq!(copied.as_ref(), b"Book Title,Dimension\nX,Y\n");
    }
}
