//! HTTP API for the merge service.
//!
//! Two routes: a multipart ZIP upload that returns the processed archive,
//! and an SSE stream of per-session processing progress.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::MergeService;

pub mod progress;
pub mod upload;

use progress::progress_handler;
use upload::upload_handler;

/// Application state
pub struct AppState {
    pub service: Arc<MergeService>,
}

/// Build the API router
pub fn router(service: Arc<MergeService>) -> Router {
    let max_body_size = service.config.server.max_upload_bytes;
    let state = Arc::new(AppState { service });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/upload/{session_id}",
            post(upload_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/progress/{session_id}", get(progress_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
