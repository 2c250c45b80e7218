use std::{fmt, sync::Arc};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        title_index::TitleIndexes,
        types::{book::Book, video::Video, ContentKind},
    },
    utils::{fuzzy, normalize::normalize_title},
};
use retrieval_pipeline::fts::{find_titles_by_fts, TitleQuery};
use tracing::{debug, info, instrument, warn};

/// Similarity (0-100) at or above which a cached title counts as the same
/// content. Near misses are preferred as duplicates over polluting the store.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 60.0;

/// One way of spotting an existing record with the same title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStrategy {
    /// Phrase query against the table's full-text title index.
    IndexedTitle,
    /// Exact match on the normalized title in the in-process index.
    NormalizedTitle,
    /// Best edit-distance score over all cached normalized titles.
    FuzzyTitle,
}

impl DuplicateStrategy {
    pub const CHAIN: [Self; 3] = [Self::IndexedTitle, Self::NormalizedTitle, Self::FuzzyTitle];

    fn name(self) -> &'static str {
        match self {
            Self::IndexedTitle => "indexed_title",
            Self::NormalizedTitle => "normalized_title",
            Self::FuzzyTitle => "fuzzy_title",
        }
    }
}

impl fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decides whether a title is already present. Strategies run in order; the
/// first one that finds a match wins, while an error or a miss hands over to
/// the next.
#[derive(Clone)]
pub struct DuplicateResolver {
    db: Arc<SurrealDbClient>,
    title_indexes: Arc<TitleIndexes>,
    strategies: Vec<DuplicateStrategy>,
    fuzzy_threshold: f64,
}

impl DuplicateResolver {
    pub fn new(db: Arc<SurrealDbClient>, title_indexes: Arc<TitleIndexes>) -> Self {
        Self::with_strategies(
            db,
            title_indexes,
            DuplicateStrategy::CHAIN.to_vec(),
            DEFAULT_FUZZY_THRESHOLD,
        )
    }

    pub fn with_strategies(
        db: Arc<SurrealDbClient>,
        title_indexes: Arc<TitleIndexes>,
        strategies: Vec<DuplicateStrategy>,
        fuzzy_threshold: f64,
    ) -> Self {
        Self {
            db,
            title_indexes,
            strategies,
            fuzzy_threshold,
        }
    }

    pub fn title_indexes(&self) -> &Arc<TitleIndexes> {
        &self.title_indexes
    }

    #[instrument(skip_all, fields(%kind, title = %title))]
    pub async fn is_duplicate(&self, title: &str, kind: ContentKind) -> bool {
        for strategy in &self.strategies {
            match self.attempt(*strategy, title, kind).await {
                Ok(true) => {
                    info!(%strategy, "Duplicate title found");
                    return true;
                }
                Ok(false) => debug!(%strategy, "No duplicate, trying next strategy"),
                Err(err) => warn!(
                    %strategy,
                    error = %err,
                    "Duplicate check failed, trying next strategy"
                ),
            }
        }
        false
    }

    async fn attempt(
        &self,
        strategy: DuplicateStrategy,
        title: &str,
        kind: ContentKind,
    ) -> Result<bool, AppError> {
        match strategy {
            DuplicateStrategy::IndexedTitle => self.indexed_match(title, kind).await,
            DuplicateStrategy::NormalizedTitle => {
                let normalized = normalize_title(title);
                Ok(self
                    .title_indexes
                    .lookup_key(&self.db, kind, &normalized)
                    .await?
                    .is_some())
            }
            DuplicateStrategy::FuzzyTitle => self.fuzzy_match(title, kind).await,
        }
    }

    async fn indexed_match(&self, title: &str, kind: ContentKind) -> Result<bool, AppError> {
        let Some(query) = TitleQuery::parse(title) else {
            return Ok(false);
        };

        let found = match kind {
            ContentKind::Book => !find_titles_by_fts::<Book>(1, &query, &self.db)
                .await?
                .is_empty(),
            ContentKind::Video => !find_titles_by_fts::<Video>(1, &query, &self.db)
                .await?
                .is_empty(),
        };
        Ok(found)
    }

    async fn fuzzy_match(&self, title: &str, kind: ContentKind) -> Result<bool, AppError> {
        let normalized = normalize_title(title);
        if normalized.is_empty() {
            return Ok(false);
        }

        let titles = self.title_indexes.normalized_titles(&self.db, kind).await?;
        let best = fuzzy::extract_best(
            &normalized,
            titles.iter().map(|candidate| (candidate.as_str(), candidate)),
            1,
            self.fuzzy_threshold,
        );

        Ok(match best.first() {
            Some((candidate, score)) => {
                debug!(candidate = %candidate, score, "Fuzzy title match");
                true
            }
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::fields::FieldMap;
    use uuid::Uuid;

    async fn memory_db(with_indexes: bool) -> Arc<SurrealDbClient> {
        let db = SurrealDbClient::memory("dedup_ns", &Uuid::new_v4().to_string())
            .await
            .expect("in-memory surrealdb");
        if with_indexes {
            db.ensure_initialized(2).await.expect("indexes");
        }
        Arc::new(db)
    }

    async fn store_book(db: &SurrealDbClient, title: &str) {
        let fields: FieldMap = [("book_title", title), ("dimension", "Spiritual")]
            .into_iter()
            .collect();
        db.store_item(Book::new(fields, title.to_string(), vec![0.1, 0.9]))
            .await
            .expect("store book");
    }

    #[tokio::test]
    async fn indexed_lookup_detects_case_variants() {
        let db = memory_db(true).await;
        store_book(&db, "The Four Agreements").await;

        let resolver = DuplicateResolver::with_strategies(
            Arc::clone(&db),
            Arc::new(TitleIndexes::new()),
            vec![DuplicateStrategy::IndexedTitle],
            DEFAULT_FUZZY_THRESHOLD,
        );

        assert!(resolver.is_duplicate("the four agreements", ContentKind::Book).await);
        assert!(!resolver.is_duplicate("Atomic Habits", ContentKind::Book).await);
    }

    #[tokio::test]
    async fn missing_index_falls_back_to_normalized_titles() {
        let db = memory_db(false).await;
        store_book(&db, "The Four Agreements").await;

        let resolver = DuplicateResolver::new(Arc::clone(&db), Arc::new(TitleIndexes::new()));

        assert!(resolver.is_duplicate("the four agreements!", ContentKind::Book).await);
        assert!(resolver.is_duplicate("The  Four-Agreements", ContentKind::Book).await);
    }

    #[tokio::test]
    async fn fuzzy_match_tolerates_typos() {
        let db = memory_db(false).await;
        store_book(&db, "The Four Agreements").await;

        let resolver = DuplicateResolver::with_strategies(
            Arc::clone(&db),
            Arc::new(TitleIndexes::new()),
            vec![DuplicateStrategy::FuzzyTitle],
            DEFAULT_FUZZY_THRESHOLD,
        );

        assert!(resolver.is_duplicate("The Four Agreemnts", ContentKind::Book).await);
        assert!(!resolver.is_duplicate("Deep Work", ContentKind::Book).await);
    }

    #[tokio::test]
    async fn kinds_do_not_collide() {
        let db = memory_db(true).await;
        store_book(&db, "Morning Yoga Flow").await;

        let resolver = DuplicateResolver::new(Arc::clone(&db), Arc::new(TitleIndexes::new()));

        assert!(resolver.is_duplicate("Morning Yoga Flow", ContentKind::Book).await);
        assert!(!resolver.is_duplicate("Morning Yoga Flow", ContentKind::Video).await);
    }

    #[tokio::test]
    async fn empty_store_has_no_duplicates() {
        let db = memory_db(true).await;
        let resolver = DuplicateResolver::new(db, Arc::new(TitleIndexes::new()));

        assert!(!resolver.is_duplicate("Anything At All", ContentKind::Video).await);
        assert!(!resolver.is_duplicate("   ", ContentKind::Book).await);
    }
}
