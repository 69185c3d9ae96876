//! Router assembly and shared handler state.

pub mod error;
pub mod routes;

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::ingest::IngestService;
use crate::transcode::FfmpegEngine;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService<FfmpegEngine>>,
    pub catalog: Arc<CatalogService>,
    pub config: Arc<Config>,
}

/// The full HTTP surface: the API routes plus read-only static delivery of
/// manifests and segments straight from the media root. The body limit is
/// disabled because the ingest path enforces its own cap while streaming.
pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(&state.config.media_root);

    Router::new()
        .route("/upload", post(routes::upload))
        .route("/videos", get(routes::list_videos))
        .route("/video-status/:id", get(routes::video_status))
        .route("/videos/:id", delete(routes::delete_video))
        .layer(DefaultBodyLimit::disable())
        .nest_service("/uploads/courses", media)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
