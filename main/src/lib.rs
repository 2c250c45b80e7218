#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

use std::{sync::Arc, time::Duration};

use async_openai::{config::OpenAIConfig, Client};
use common::{
    error::AppError,
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::{
        config::AppConfig,
        embedding::{EmbeddingProvider, EmbeddingService},
    },
};
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

/// Connects to the store and defines the analyzer and indexes. Both binaries
/// refuse to start when either step fails.
pub async fn connect_store(config: &AppConfig) -> Result<Arc<SurrealDbClient>, AppError> {
    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );

    db.ensure_initialized(config.embedding_dimension()?).await?;

    Ok(db)
}

pub fn openai_client(config: &AppConfig) -> Arc<Client<OpenAIConfig>> {
    Arc::new(Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.embedding_api_key)
            .with_api_base(&config.embedding_base_url),
    ))
}

pub fn embedding_provider(
    config: &AppConfig,
    client: &Arc<Client<OpenAIConfig>>,
) -> Result<Arc<dyn EmbeddingService>, AppError> {
    let provider = EmbeddingProvider::from_config(config, Some(Arc::clone(client)))?;
    info!(
        embedding_backend = provider.backend_label(),
        embedding_model = ?provider.model_code(),
        embedding_dimension = provider.dimension(),
        "Embedding provider initialized"
    );
    Ok(Arc::new(provider))
}

/// Removes artifacts older than `retention` once per `retention`.
pub fn spawn_artifact_purge(storage: StorageManager, retention: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(retention);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match storage.purge_older_than(retention).await {
                Ok(removed) => info!(removed, "Artifact purge finished"),
                Err(err) => error!(error = %err, "Artifact purge failed"),
            }
        }
    })
}
