use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{api_state::ApiState, error::ApiError};

/// Admits requests carrying the configured shared key.
pub async fn api_auth(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state.config.api_key.as_str();
    let authorized =
        extract_api_key(&request).is_some_and(|key| !expected.is_empty() && key == expected);

    if !authorized {
        return Err(ApiError::Unauthorized(
            "You have to be authenticated".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

fn extract_api_key(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|auth| auth.strip_prefix("Bearer ").map(str::trim))
        })
}
