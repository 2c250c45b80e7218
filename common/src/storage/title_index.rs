//! In-process map from normalized title to stored record, per table.
//!
//! Built lazily from one full scan and then kept current by the writers:
//! successful stores upsert, deletions invalidate. The scan runs under the
//! write lock, so an upsert issued during a build lands in the built map.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{book::Book, video::Video, ContentKind, TitledRecord},
    },
    utils::normalize::normalize_title,
};

pub struct TitleIndex<T: TitledRecord> {
    entries: RwLock<Option<HashMap<String, T>>>,
}

impl<T: TitledRecord> Default for TitleIndex<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(None),
        }
    }
}

impl<T: TitledRecord> TitleIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an already normalized title, building the index on first use.
    pub async fn lookup(&self, db: &SurrealDbClient, normalized: &str) -> Result<Option<T>, AppError> {
        if normalized.is_empty() {
            return Ok(None);
        }
        self.with_entries(db, |entries| entries.get(normalized).cloned())
            .await
    }

    /// Every cached normalized title, building the index on first use.
    pub async fn normalized_titles(&self, db: &SurrealDbClient) -> Result<Vec<String>, AppError> {
        self.with_entries(db, |entries| entries.keys().cloned().collect())
            .await
    }

    async fn with_entries<R>(
        &self,
        db: &SurrealDbClient,
        read: impl FnOnce(&HashMap<String, T>) -> R,
    ) -> Result<R, AppError> {
        if let Some(entries) = self.entries.read().await.as_ref() {
            return Ok(read(entries));
        }

        let mut guard = self.entries.write().await;
        let entries = match guard.take() {
            Some(entries) => entries,
            None => Self::scan(db).await?,
        };
        let result = read(&entries);
        *guard = Some(entries);
        Ok(result)
    }

    /// Records a freshly stored item. A no-op while the index is unbuilt; the
    /// first lookup will scan it in.
    pub async fn upsert(&self, item: &T) {
        if let Some(entries) = self.entries.write().await.as_mut() {
            let normalized = normalize_title(item.title());
            if !normalized.is_empty() {
                entries.insert(normalized, item.clone());
            }
        }
    }

    /// Drops the cached map so the next lookup rescans.
    pub async fn invalidate(&self) {
        *self.entries.write().await = None;
    }

    pub async fn is_built(&self) -> bool {
        self.entries.read().await.is_some()
    }

    async fn scan(db: &SurrealDbClient) -> Result<HashMap<String, T>, AppError> {
        let items: Vec<T> = db.get_all_stored_items::<T>().await?;
        debug!(table = T::KIND.table(), records = items.len(), "Building title index");

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let normalized = normalize_title(item.title());
                (!normalized.is_empty()).then_some((normalized, item))
            })
            .collect())
    }
}

/// One title index per table.
#[derive(Default)]
pub struct TitleIndexes {
    pub books: TitleIndex<Book>,
    pub videos: TitleIndex<Video>,
}

impl TitleIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the record whose normalized title equals `normalized`, if any.
    pub async fn lookup_key(
        &self,
        db: &SurrealDbClient,
        kind: ContentKind,
        normalized: &str,
    ) -> Result<Option<String>, AppError> {
        Ok(match kind {
            ContentKind::Book => self.books.lookup(db, normalized).await?.map(|b| b.key()),
            ContentKind::Video => self.videos.lookup(db, normalized).await?.map(|v| v.key()),
        })
    }

    pub async fn normalized_titles(
        &self,
        db: &SurrealDbClient,
        kind: ContentKind,
    ) -> Result<Vec<String>, AppError> {
        match kind {
            ContentKind::Book => self.books.normalized_titles(db).await,
            ContentKind::Video => self.videos.normalized_titles(db).await,
        }
    }

    pub async fn invalidate(&self, kind: ContentKind) {
        match kind {
            ContentKind::Book => self.books.invalidate().await,
            ContentKind::Video => self.videos.invalidate().await,
        }
    }
}
