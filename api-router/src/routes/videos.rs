use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    status::StatusMessage,
    storage::{keys::delete_keys, types::{ContentKind, TitledRecord}},
};
use ingestion_pipeline::VideoIngestError;
use serde::Deserialize;
use serde_json::json;

use super::{DeleteParams, SearchParams};
use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct IngestVideoParams {
    pub url: String,
}

pub async fn ingest_video(
    State(state): State<ApiState>,
    Json(params): Json<IngestVideoParams>,
) -> Response {
    match state.video_pipeline.ingest_video(&params.url).await {
        Ok(video) => (
            StatusCode::OK,
            Json(json!({
                "status": StatusMessage::success(format!("Stored {}", video.key())),
                "video": video,
            })),
        )
            .into_response(),
        Err(err) => (
            abort_status(&err),
            Json(json!({ "status": err.status_message() })),
        )
            .into_response(),
    }
}

fn abort_status(err: &VideoIngestError) -> StatusCode {
    match err {
        VideoIngestError::InvalidUrl => StatusCode::BAD_REQUEST,
        VideoIngestError::AlreadyExists(_) => StatusCode::CONFLICT,
        VideoIngestError::EmptyTranscript | VideoIngestError::InvalidArtifact => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        VideoIngestError::Tagging(_) | VideoIngestError::Embedding(_) => StatusCode::BAD_GATEWAY,
        VideoIngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn search_videos(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.search.search_videos(&params.q).await?))
}

pub async fn delete_videos(
    State(state): State<ApiState>,
    Query(params): Query<DeleteParams>,
) -> impl IntoResponse {
    Json(delete_keys(&state.db, &state.title_indexes, &params.keys, ContentKind::Video).await)
}
