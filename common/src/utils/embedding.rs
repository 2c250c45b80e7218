use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Arc,
};

use async_openai::{error::OpenAIError, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::{
    error::AppError,
    utils::config::{AppConfig, EmbeddingBackendKind},
};

/// Failure of a single embedding call. Always record-local: callers skip the
/// record and keep going.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding transport failed: {0}")]
    Transport(#[source] OpenAIError),
    #[error("embedding service rejected the request: {0}")]
    Api(#[source] OpenAIError),
    #[error("embedding service returned no vector")]
    EmptyResponse,
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<OpenAIError> for EmbeddingError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(_) | OpenAIError::StreamError(_) => Self::Transport(err),
            _ => Self::Api(err),
        }
    }
}

/// Seam between the pipelines and whatever produces vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;
}

#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    OpenAI {
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
        dimensions: usize,
    },
    Hashed {
        dimension: usize,
    },
}

impl EmbeddingProvider {
    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Hashed { .. } => "hashed",
            EmbeddingInner::OpenAI { .. } => "openai",
        }
    }

    pub fn model_code(&self) -> Option<String> {
        match &self.inner {
            EmbeddingInner::OpenAI { model, .. } => Some(model.clone()),
            EmbeddingInner::Hashed { .. } => None,
        }
    }

    pub fn new_openai(
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
        dimensions: usize,
    ) -> Self {
        EmbeddingProvider {
            inner: EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            },
        }
    }

    pub fn new_hashed(dimension: usize) -> Self {
        EmbeddingProvider {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }

    /// Builds the provider selected in configuration. The OpenAI-compatible
    /// backend reuses `client` when given, otherwise creates one from config.
    pub fn from_config(
        config: &AppConfig,
        client: Option<Arc<Client<async_openai::config::OpenAIConfig>>>,
    ) -> Result<Self, AppError> {
        let dimensions = config.embedding_dimension()?;
        Ok(match config.embedding_backend {
            EmbeddingBackendKind::Hashed => Self::new_hashed(dimensions),
            EmbeddingBackendKind::OpenAI => {
                let client = client.unwrap_or_else(|| {
                    Arc::new(Client::with_config(
                        async_openai::config::OpenAIConfig::new()
                            .with_api_key(&config.embedding_api_key)
                            .with_api_base(&config.embedding_base_url),
                    ))
                });
                Self::new_openai(client, config.embedding_model.clone(), dimensions)
            }
        })
    }
}

#[async_trait]
impl EmbeddingService for EmbeddingProvider {
    /// Sends `text` as a single-element batch. No retries here.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(hashed_embedding(text, *dimension)),
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input([text])
                    .build()?;

                let response = client.embeddings().create(request).await?;

                let embedding = response
                    .data
                    .into_iter()
                    .next()
                    .ok_or(EmbeddingError::EmptyResponse)?
                    .embedding;

                if embedding.len() != *dimensions {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: *dimensions,
                        actual: embedding.len(),
                    });
                }

                debug!(dimensions = embedding.len(), "Embedding was created");

                Ok(embedding)
            }
        }
    }

    fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => *dimension,
            EmbeddingInner::OpenAI { dimensions, .. } => *dimensions,
        }
    }
}

// Helper functions for hashed embeddings
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];
    if text.is_empty() {
        return vector;
    }

    let mut token_count = 0usize;
    for token in tokens(text) {
        token_count = token_count.saturating_add(1);
        if let Some(slot) = vector.get_mut(bucket(&token, dim)) {
            *slot += 1.0;
        }
    }

    if token_count == 0 {
        return vector;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

#[allow(clippy::cast_possible_truncation)]
fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashed_backend_is_deterministic_and_sized() {
        let provider = EmbeddingProvider::new_hashed(64);
        let first = provider.embed("The Four Agreements Spiritual").await.expect("embed");
        let second = provider.embed("The Four Agreements Spiritual").await.expect("embed");

        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
        assert_eq!(provider.backend_label(), "hashed");
    }

    #[tokio::test]
    async fn hashed_backend_normalizes_vectors() {
        let provider = EmbeddingProvider::new_hashed(32);
        let vector = provider.embed("calm calm focus").await.expect("embed");
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_yields_zero_vector() {
        let provider = EmbeddingProvider::new_hashed(8);
        let vector = provider.embed("").await.expect("embed");
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn request_errors_are_classified() {
        let api = EmbeddingError::from(OpenAIError::InvalidArgument("bad input".into()));
        assert!(matches!(api, EmbeddingError::Api(_)));
        assert!(api.to_string().contains("bad input"));
    }

    #[test]
    fn config_selects_backend() {
        let config = AppConfig {
            embedding_backend: EmbeddingBackendKind::Hashed,
            embedding_dimensions: 16,
            ..Default::default()
        };
        let provider = EmbeddingProvider::from_config(&config, None).expect("provider");
        assert_eq!(provider.backend_label(), "hashed");
        assert_eq!(provider.dimension(), 16);
        assert!(provider.model_code().is_none());
    }

    #[test]
    fn zero_dimension_config_is_rejected() {
        let config = AppConfig {
            embedding_backend: EmbeddingBackendKind::Hashed,
            embedding_dimensions: 0,
            ..Default::default()
        };
        assert!(matches!(
            EmbeddingProvider::from_config(&config, None),
            Err(AppError::Validation(_))
        ));
    }
}
