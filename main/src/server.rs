use std::{sync::Arc, time::Duration};

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    storage::{store::StorageManager, title_index::TitleIndexes},
    utils::config::get_config,
};
use ingestion_pipeline::VideoIngestionPipeline;
use tracing::info;
use wellness_catalog::{
    connect_store, embedding_provider, init_tracing, openai_client, spawn_artifact_purge,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = get_config()?;
    let db = connect_store(&config).await?;
    let storage = StorageManager::new(&config).await?;
    let openai_client = openai_client(&config);
    let embedding = embedding_provider(&config, &openai_client)?;
    let title_indexes = Arc::new(TitleIndexes::new());

    let video_pipeline = VideoIngestionPipeline::new(
        Arc::clone(&db),
        storage.clone(),
        Arc::clone(&title_indexes),
        openai_client,
        &config,
        Arc::clone(&embedding),
    )?;

    if let Some(secs) = config.artifact_retention_secs.filter(|secs| *secs > 0) {
        info!(retention_secs = secs, "Scheduling artifact purge");
        spawn_artifact_purge(storage.clone(), Duration::from_secs(secs));
    }

    let api_state = ApiState::new(
        db,
        config.clone(),
        storage,
        title_indexes,
        embedding,
        video_pipeline,
    );

    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(api_state);

    let serve_address = format!("{}:{}", config.http_host, config.http_port);
    info!("Starting server listening on {serve_address}");
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
