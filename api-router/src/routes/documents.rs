use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use common::storage::keys::get_document;

use crate::{api_state::ApiState, error::ApiError};

pub async fn get_document_by_key(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = get_document(&state.db, &key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No document stored under '{key}'")))?;

    Ok(Json(document))
}
