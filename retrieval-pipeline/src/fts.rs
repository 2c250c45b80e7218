use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::TitledRecord},
    utils::normalize::to_search_terms,
};
use common::storage::types::book::deserialize_flexible_id;
use surrealdb::sql::Thing;

/// Candidates fetched from the index per requested hit, before phrase/prefix
/// filtering narrows them down.
const CANDIDATE_FACTOR: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every term must appear, consecutively and in order.
    Phrase,
    /// Like `Phrase`, but the last term only needs to start a title word.
    Prefix,
}

/// A title query reduced to plain terms plus its matching mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleQuery {
    terms: Vec<String>,
    mode: MatchMode,
}

impl TitleQuery {
    /// Phrase mode when the trimmed input contains whitespace, prefix mode
    /// otherwise. `None` when nothing searchable is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let terms: Vec<String> = to_search_terms(raw)
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if terms.is_empty() {
            return None;
        }

        let mode = if raw.trim().contains(char::is_whitespace) {
            MatchMode::Phrase
        } else {
            MatchMode::Prefix
        };

        Some(Self { terms, mode })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Terms as handed to the full-text analyzer.
    pub fn index_terms(&self) -> String {
        self.terms.join(" ")
    }

    pub fn matches(&self, title: &str) -> bool {
        let words: Vec<String> = to_search_terms(title)
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        let wanted = self.terms.len();
        if words.len() < wanted {
            return false;
        }

        words.windows(wanted).any(|window| {
            window
                .iter()
                .zip(&self.terms)
                .enumerate()
                .all(|(position, (word, term))| {
                    let last = position.saturating_add(1) == wanted;
                    if last && self.mode == MatchMode::Prefix {
                        word.starts_with(term.as_str())
                    } else {
                        word == term
                    }
                })
        })
    }
}

#[derive(Debug, Deserialize)]
struct FtsScoreRow {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    id: String,
    title: Option<String>,
    fts_score: Option<f32>,
}

/// A record returned by the title index, with its relevance score.
#[derive(Debug, Clone)]
pub struct TitleHit<T> {
    pub item: T,
    pub score: f32,
}

/// Runs `query` against the title index of `T`'s table and returns at most
/// `take` records that satisfy the query's phrase/prefix semantics, best first.
///
/// Errors when the index is missing or the store rejects the query; callers
/// decide whether that warrants a fallback.
pub async fn find_titles_by_fts<T>(
    take: usize,
    query: &TitleQuery,
    db_client: &SurrealDbClient,
) -> Result<Vec<TitleHit<T>>, AppError>
where
    T: TitledRecord,
{
    let table = T::KIND.table();
    let field = T::KIND.title_field();

    let sql = format!(
        "SELECT id, {field} AS title, search::score(0) AS fts_score \
         FROM {table} \
         WHERE {field} @0@ $terms \
         ORDER BY fts_score DESC \
         LIMIT $limit"
    );

    debug!(
        table,
        mode = ?query.mode(),
        limit = take,
        "Executing title FTS query"
    );

    let candidate_limit = take.saturating_mul(CANDIDATE_FACTOR).max(1);
    let mut response = db_client
        .query(sql)
        .bind(("terms", query.index_terms()))
        .bind(("limit", i64::try_from(candidate_limit).unwrap_or(i64::MAX)))
        .await?;

    let score_rows: Vec<FtsScoreRow> = response.take(0)?;

    let matching: Vec<FtsScoreRow> = score_rows
        .into_iter()
        .filter(|row| row.title.as_deref().is_some_and(|title| query.matches(title)))
        .take(take)
        .collect();

    if matching.is_empty() {
        return Ok(Vec::new());
    }

    let thing_ids: Vec<Thing> = matching
        .iter()
        .map(|row| Thing::from((table, row.id.as_str())))
        .collect();

    let mut items_response = db_client
        .query("SELECT * FROM type::table($table) WHERE id IN $things")
        .bind(("table", table))
        .bind(("things", thing_ids))
        .await?;

    let items: Vec<T> = items_response.take(0)?;

    let mut item_map: HashMap<String, T> = items
        .into_iter()
        .map(|item| (item.get_id().to_owned(), item))
        .collect();

    Ok(matching
        .into_iter()
        .filter_map(|row| {
            item_map.remove(&row.id).map(|item| TitleHit {
                item,
                score: row.fts_score.unwrap_or_default(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::{book::Book, fields::FieldMap};
    use uuid::Uuid;

    async fn indexed_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("fts_test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("failed to create in-memory surreal");
        db.ensure_initialized(4)
            .await
            .expect("failed to build runtime indexes");
        db
    }

    async fn store_book(db: &SurrealDbClient, title: &str) -> Book {
        let fields: FieldMap = [("book_title", title)].into_iter().collect();
        let book = Book::new(fields, title.to_string(), vec![0.1, 0.2, 0.3, 0.4]);
        db.store_item(book.clone()).await.expect("store book");
        book
    }

    #[test]
    fn parse_picks_mode_from_whitespace() {
        let phrase = TitleQuery::parse("The Four").expect("phrase");
        assert_eq!(phrase.mode(), MatchMode::Phrase);
        assert_eq!(phrase.index_terms(), "the four");

        let prefix = TitleQuery::parse("Atom*").expect("prefix");
        assert_eq!(prefix.mode(), MatchMode::Prefix);
        assert_eq!(prefix.index_terms(), "atom");

        assert!(TitleQuery::parse("  ** ").is_none());
    }

    #[test]
    fn phrase_requires_consecutive_terms() {
        let query = TitleQuery::parse("four agreements").expect("query");
        assert!(query.matches("The Four Agreements"));
        assert!(!query.matches("Agreements: The Four"));
        assert!(!query.matches("The Four Agreement"));
    }

    #[test]
    fn prefix_matches_word_starts_only() {
        let query = TitleQuery::parse("habit").expect("query");
        assert!(query.matches("Atomic Habits"));
        assert!(!query.matches("Inhabited Worlds"));
    }

    #[tokio::test]
    async fn finds_titles_by_prefix_and_phrase() {
        let db = indexed_db().await;
        let four = store_book(&db, "The Four Agreements").await;
        store_book(&db, "Atomic Habits").await;

        let prefix = TitleQuery::parse("agree").expect("query");
        let hits = find_titles_by_fts::<Book>(5, &prefix, &db)
            .await
            .expect("prefix search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, four.id);

        let phrase = TitleQuery::parse("the four agreements").expect("query");
        let hits = find_titles_by_fts::<Book>(1, &phrase, &db)
            .await
            .expect("phrase search");
        assert_eq!(hits.len(), 1);

        let miss = TitleQuery::parse("four habits").expect("query");
        let hits = find_titles_by_fts::<Book>(5, &miss, &db)
            .await
            .expect("miss search");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn missing_index_is_an_error() {
        let db = SurrealDbClient::memory("fts_test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("failed to create in-memory surreal");
        store_book(&db, "Atomic Habits").await;

        let query = TitleQuery::parse("atomic").expect("query");
        assert!(find_titles_by_fts::<Book>(1, &query, &db).await.is_err());
    }
}
