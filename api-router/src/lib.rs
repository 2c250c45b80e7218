#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use middleware_api_auth::api_auth;
use routes::{
    books::{delete_books, search_books, upload_books},
    documents::get_document_by_key,
    probes::{live, ready},
    videos::{delete_videos, ingest_video, search_videos},
};

pub mod api_state;
pub mod error;
mod middleware_api_auth;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let public = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let protected = Router::new()
        .route(
            "/books/upload",
            post(upload_books).layer(DefaultBodyLimit::max(
                app_state.config.upload_max_body_bytes,
            )),
        )
        .route("/books/search", get(search_books))
        .route("/books", axum::routing::delete(delete_books))
        .route("/videos", post(ingest_video).delete(delete_videos))
        .route("/videos/search", get(search_videos))
        .route("/documents/{key}", get(get_document_by_key))
        .route_layer(from_fn_with_state(app_state.clone(), api_auth));

    public.merge(protected)
}
