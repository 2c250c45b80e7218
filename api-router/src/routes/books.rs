use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use common::storage::{keys::delete_keys, types::ContentKind};
use ingestion_pipeline::UploadSource;
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::info;

use super::{DeleteParams, SearchParams};
use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
}

pub async fn upload_books(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let file_name = input.file.metadata.file_name.clone();
    info!(file_name = ?file_name, "Received book upload");

    // The temp file is removed when `input` drops, after resolution copied it.
    let upload = UploadSource::Path {
        path: input.file.contents.path().to_path_buf(),
        file_name,
    }
    .resolve(&state.storage)
    .await?;

    let outcome = state.book_pipeline.ingest(&upload).await?;

    Ok(Json(json!({
        "summary": outcome.summary.to_string(),
        "counts": outcome.summary,
        "processed_books": outcome.books,
    })))
}

pub async fn search_books(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.search.search_books(&params.q).await?))
}

pub async fn delete_books(
    State(state): State<ApiState>,
    Query(params): Query<DeleteParams>,
) -> impl IntoResponse {
    Json(delete_keys(&state.db, &state.title_indexes, &params.keys, ContentKind::Book).await)
}
