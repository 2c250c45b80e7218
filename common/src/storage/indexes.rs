use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::AppError,
    storage::{db::SurrealDbClient, types::ContentKind},
};

/// Analyzer behind the title indexes. Edge n-grams let a leading fragment of
/// a word match the full word.
pub const TITLE_ANALYZER_NAME: &str = "title_prefix_analyzer";
const TITLE_NGRAM_MAX: usize = 32;

#[derive(Clone, Copy)]
struct HnswIndexSpec {
    index_name: &'static str,
    table: &'static str,
}

impl HnswIndexSpec {
    fn definition(&self, dimension: usize, overwrite: bool) -> String {
        let mode = if overwrite { "OVERWRITE" } else { "IF NOT EXISTS" };
        format!(
            "DEFINE INDEX {mode} {index} ON TABLE {table} \
             FIELDS embedding HNSW DIMENSION {dimension} DIST COSINE TYPE F32 EFC 100 M 8;",
            index = self.index_name,
            table = self.table,
        )
    }
}

#[derive(Clone, Copy)]
struct FtsIndexSpec {
    index_name: &'static str,
    table: &'static str,
    field: &'static str,
}

impl FtsIndexSpec {
    fn for_kind(kind: ContentKind) -> Self {
        Self {
            index_name: kind.title_index_name(),
            table: kind.table(),
            field: kind.title_field(),
        }
    }

    fn definition(&self) -> String {
        format!(
            "DEFINE INDEX IF NOT EXISTS {index} ON TABLE {table} \
             FIELDS {field} SEARCH ANALYZER {TITLE_ANALYZER_NAME} BM25;",
            index = self.index_name,
            table = self.table,
            field = self.field,
        )
    }
}

const HNSW_INDEX_SPECS: [HnswIndexSpec; 2] = [
    HnswIndexSpec {
        index_name: "idx_book_embedding",
        table: "book",
    },
    HnswIndexSpec {
        index_name: "idx_video_embedding",
        table: "video",
    },
];

/// Defines the title analyzer plus the title (full-text) and embedding
/// (vector) indexes for both tables. Idempotent; an embedding index built for
/// a different dimension is redefined.
pub async fn ensure_runtime_indexes(
    db: &SurrealDbClient,
    embedding_dimension: usize,
) -> Result<(), AppError> {
    ensure_runtime_indexes_inner(db, embedding_dimension)
        .await
        .map_err(|err| AppError::InternalError(format!("{err:#}")))
}

async fn ensure_runtime_indexes_inner(db: &SurrealDbClient, embedding_dimension: usize) -> Result<()> {
    create_title_analyzer(db).await?;

    for kind in [ContentKind::Book, ContentKind::Video] {
        let spec = FtsIndexSpec::for_kind(kind);
        define(db, spec.definition(), spec.index_name, spec.table).await?;
    }

    let target_dimension =
        u64::try_from(embedding_dimension).context("embedding dimension does not fit in u64")?;

    for spec in HNSW_INDEX_SPECS {
        let overwrite = match current_hnsw_dimension(db, &spec).await? {
            Some(existing) if existing != target_dimension => {
                info!(
                    index = spec.index_name,
                    table = spec.table,
                    existing_dimension = existing,
                    target_dimension = embedding_dimension,
                    "Redefining embedding index for new dimension"
                );
                true
            }
            _ => false,
        };
        define(
            db,
            spec.definition(embedding_dimension, overwrite),
            spec.index_name,
            spec.table,
        )
        .await?;
    }

    Ok(())
}

async fn create_title_analyzer(db: &SurrealDbClient) -> Result<()> {
    let analyzer_query = format!(
        "DEFINE ANALYZER IF NOT EXISTS {TITLE_ANALYZER_NAME}
            TOKENIZERS class
            FILTERS lowercase, ascii, edgengram(1, {TITLE_NGRAM_MAX});"
    );

    db.client
        .query(analyzer_query)
        .await
        .context("creating title analyzer")?
        .check()
        .context("title analyzer definition failed")?;
    Ok(())
}

async fn define(db: &SurrealDbClient, definition: String, index_name: &str, table: &str) -> Result<()> {
    db.client
        .query(definition)
        .await
        .with_context(|| format!("creating index {index_name} on table {table}"))?
        .check()
        .with_context(|| format!("index definition failed for {index_name} on {table}"))?;

    debug!(index = %index_name, table = %table, "Index defined");
    Ok(())
}

async fn current_hnsw_dimension(db: &SurrealDbClient, spec: &HnswIndexSpec) -> Result<Option<u64>> {
    let mut response = db
        .client
        .query(format!("INFO FOR TABLE {};", spec.table))
        .await
        .with_context(|| format!("fetching table info for {}", spec.table))?;

    let info: surrealdb::Value = response
        .take(0)
        .context("failed to take table info response")?;
    let info_json: Value =
        serde_json::to_value(info).context("serializing table info to JSON for parsing")?;

    Ok(index_definition(&info_json, spec.index_name).and_then(extract_dimension))
}

/// Finds an index definition inside an `INFO FOR TABLE` result, accepting both
/// the plain and the type-tagged JSON shapes.
fn index_definition<'a>(info: &'a Value, index_name: &str) -> Option<&'a str> {
    let object = info.get("Object").unwrap_or(info);
    let indexes = object.get("indexes")?;
    let indexes = indexes.get("Object").unwrap_or(indexes);
    let definition = indexes.get(index_name)?;
    definition
        .get("Strand")
        .unwrap_or(definition)
        .as_str()
}

fn extract_dimension(definition: &str) -> Option<u64> {
    definition
        .split("DIMENSION")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|token| token.trim_end_matches(';').parse::<u64>().ok())
}
