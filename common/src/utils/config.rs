use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    #[default]
    OpenAI,
    Hashed,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub embedding_api_key: String,
    #[serde(default = "default_embedding_base_url")]
    pub embedding_base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackendKind,
    #[serde(default = "default_tagging_model")]
    pub tagging_model: String,
    #[serde(default)]
    pub transcript_service_url: Option<String>,
    #[serde(default = "default_transcript_language")]
    pub transcript_language: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    pub api_key: String,
    #[serde(default)]
    pub artifact_retention_secs: Option<u64>,
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
}

fn default_embedding_base_url() -> String {
    "https://api.deepinfra.com/v1/openai".to_string()
}

fn default_embedding_model() -> String {
    "BAAI/bge-base-en-v1.5".to_string()
}

fn default_embedding_dimensions() -> u32 {
    768
}

fn default_tagging_model() -> String {
    "deepseek-ai/DeepSeek-R1-Distill-Qwen-32B".to_string()
}

fn default_transcript_language() -> String {
    "en".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    7860
}

fn default_upload_max_body_bytes() -> usize {
    20_000_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surrealdb_address: String::new(),
            surrealdb_username: String::new(),
            surrealdb_password: String::new(),
            surrealdb_namespace: String::new(),
            surrealdb_database: String::new(),
            embedding_api_key: String::new(),
            embedding_base_url: default_embedding_base_url(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            embedding_backend: EmbeddingBackendKind::default(),
            tagging_model: default_tagging_model(),
            transcript_service_url: None,
            transcript_language: default_transcript_language(),
            data_dir: default_data_dir(),
            storage: default_storage_kind(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            api_key: String::new(),
            artifact_retention_secs: None,
            upload_max_body_bytes: default_upload_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Configured embedding width as a vector length. Zero is rejected.
    pub fn embedding_dimension(&self) -> Result<usize, AppError> {
        let dimension = usize::try_from(self.embedding_dimensions).map_err(|_| {
            AppError::Validation(format!(
                "embedding_dimensions {} does not fit this platform",
                self.embedding_dimensions
            ))
        })?;
        if dimension == 0 {
            return Err(AppError::Validation(
                "embedding_dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(dimension)
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
