use std::sync::Arc;

use common::{
    storage::{store::StorageManager, title_index::TitleIndexes},
    utils::config::get_config,
};
use ingestion_pipeline::VideoBackfill;
use tracing::info;
use wellness_catalog::{connect_store, embedding_provider, init_tracing, openai_client};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = get_config()?;
    let db = connect_store(&config).await?;
    let storage = StorageManager::new(&config).await?;
    let embedding = embedding_provider(&config, &openai_client(&config))?;

    let summary = VideoBackfill::new(db, storage, embedding, Arc::new(TitleIndexes::new()))
        .run()
        .await?;

    info!(
        total = summary.total,
        stored = summary.stored,
        skipped = summary.skipped,
        failed = summary.failed,
        "Backfill complete"
    );

    Ok(())
}
