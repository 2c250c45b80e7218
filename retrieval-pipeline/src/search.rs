//! Resolves free-text or identifier queries to stored books and videos.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{book::Book, video::Video, ContentKind, Document, TitledRecord},
    },
    utils::{fuzzy, video_id::extract_video_id},
};

use crate::fts::{find_titles_by_fts, TitleQuery};

/// Upper bound on indexed title hits returned to the caller.
pub const INDEXED_RESULT_LIMIT: usize = 50;
pub const FUZZY_RESULT_LIMIT: usize = 5;
pub const FUZZY_SCORE_CUTOFF: f64 = 40.0;

/// One entry of a search result: a stored record, or the single "nothing
/// found" placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchDocument {
    Record(Document),
    Placeholder { message: String },
}

/// Keys and documents in matching order. An empty `keys` list means nothing
/// was found; `documents` then holds exactly one placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub keys: Vec<String>,
    pub documents: Vec<SearchDocument>,
}

impl SearchResults {
    fn from_records<T: TitledRecord + Into<Document>>(records: Vec<T>) -> Self {
        let keys = records.iter().map(TitledRecord::key).collect();
        let documents = records
            .into_iter()
            .map(|record| SearchDocument::Record(record.into()))
            .collect();
        Self { keys, documents }
    }

    fn not_found(kind: ContentKind, query: &str) -> Self {
        Self {
            keys: Vec::new(),
            documents: vec![SearchDocument::Placeholder {
                message: format!("❌ No related {kind} results found for: '{query}'"),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub struct SearchResolver {
    db: Arc<SurrealDbClient>,
}

impl SearchResolver {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }

    #[instrument(skip_all, fields(query = %query))]
    pub async fn search_books(&self, query: &str) -> Result<SearchResults, AppError> {
        let records = self.search_titles::<Book>(query).await?;
        Ok(finish(ContentKind::Book, query, records))
    }

    /// A query carrying a video id is first tried as a direct key lookup; a
    /// miss falls through to the title search.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn search_videos(&self, query: &str) -> Result<SearchResults, AppError> {
        if let Some(video_id) = extract_video_id(query) {
            match self.db.get_item::<Video>(&video_id).await {
                Ok(Some(video)) => return Ok(SearchResults::from_records(vec![video])),
                Ok(None) => info!(%video_id, "No stored video for id, searching titles"),
                Err(err) => warn!(%video_id, error = %err, "Video key lookup failed"),
            }
        }

        let records = self.search_titles::<Video>(query).await?;
        Ok(finish(ContentKind::Video, query, records))
    }

    async fn search_titles<T: TitledRecord>(&self, query: &str) -> Result<Vec<T>, AppError> {
        let Some(title_query) = TitleQuery::parse(query) else {
            return Ok(Vec::new());
        };

        match find_titles_by_fts::<T>(INDEXED_RESULT_LIMIT, &title_query, &self.db).await {
            Ok(hits) if !hits.is_empty() => {
                return Ok(hits.into_iter().map(|hit| hit.item).collect());
            }
            Ok(_) => info!(
                table = T::KIND.table(),
                "Title index had no match, falling back to fuzzy search"
            ),
            Err(err) => warn!(
                table = T::KIND.table(),
                error = %err,
                "Title index query failed, falling back to fuzzy search"
            ),
        }

        fuzzy_fallback::<T>(&self.db, query).await
    }
}

/// Full scan of the table ranked by title similarity.
async fn fuzzy_fallback<T: TitledRecord>(
    db: &SurrealDbClient,
    query: &str,
) -> Result<Vec<T>, AppError> {
    let records: Vec<T> = db.get_all_stored_items::<T>().await?;

    let ranked = fuzzy::extract_best(
        query,
        records.iter().map(|record| (record.title(), record)),
        FUZZY_RESULT_LIMIT,
        FUZZY_SCORE_CUTOFF,
    );

    Ok(ranked.into_iter().map(|(record, _)| record.clone()).collect())
}

fn finish<T: TitledRecord + Into<Document>>(
    kind: ContentKind,
    query: &str,
    records: Vec<T>,
) -> SearchResults {
    if records.is_empty() {
        info!(%kind, %query, "No results found");
        SearchResults::not_found(kind, query)
    } else {
        SearchResults::from_records(records)
    }
}
