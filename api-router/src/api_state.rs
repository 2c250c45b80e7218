use std::sync::Arc;

use common::{
    storage::{db::SurrealDbClient, store::StorageManager, title_index::TitleIndexes},
    utils::{config::AppConfig, embedding::EmbeddingService},
};
use ingestion_pipeline::{BookIngestionPipeline, DuplicateResolver, VideoIngestionPipeline};
use retrieval_pipeline::SearchResolver;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub storage: StorageManager,
    pub title_indexes: Arc<TitleIndexes>,
    pub book_pipeline: Arc<BookIngestionPipeline>,
    pub video_pipeline: Arc<VideoIngestionPipeline>,
    pub search: Arc<SearchResolver>,
}

impl ApiState {
    /// Wires the book pipeline and search resolver around shared resources.
    /// The video pipeline is built by the caller since it owns the external
    /// collaborators.
    pub fn new(
        db: Arc<SurrealDbClient>,
        config: AppConfig,
        storage: StorageManager,
        title_indexes: Arc<TitleIndexes>,
        embedding: Arc<dyn EmbeddingService>,
        video_pipeline: VideoIngestionPipeline,
    ) -> Self {
        let resolver = DuplicateResolver::new(Arc::clone(&db), Arc::clone(&title_indexes));
        let book_pipeline =
            BookIngestionPipeline::new(Arc::clone(&db), storage.clone(), resolver, embedding);

        Self {
            search: Arc::new(SearchResolver::new(Arc::clone(&db))),
            db,
            config,
            storage,
            title_indexes,
            book_pipeline: Arc::new(book_pipeline),
            video_pipeline: Arc::new(video_pipeline),
        }
    }
}
