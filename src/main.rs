use lectern::catalog::CatalogService;
use lectern::config::Config;
use lectern::http::{self, AppState};
use lectern::ingest::IngestService;
use lectern::metadata::MetadataRepository;
use lectern::store::AssetStore;
use lectern::transcode::FfmpegEngine;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    tracing_subscriber::fmt::init();

    let store = AssetStore::new(&config.media_root);
    tokio::fs::create_dir_all(store.root())
        .await
        .expect("Failed to create media root");

    let metadata = MetadataRepository::new(store.clone());
    let engine = FfmpegEngine::new(
        config.ffmpeg_path.clone(),
        config.segment_seconds,
        Duration::from_secs(config.transcode_timeout_secs),
    );
    let ingest = Arc::new(IngestService::new(
        store.clone(),
        metadata.clone(),
        engine,
        config.max_upload_bytes,
        config.max_concurrent_transcodes,
    ));
    let catalog = Arc::new(CatalogService::new(store, metadata));

    let addr = format!("{}:{}", config.addr, config.port);
    let state = AppState {
        ingest,
        catalog,
        config: Arc::new(config),
    };
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind TCP listener");
    info!("Listening at {}", addr);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
