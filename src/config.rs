//! Environment-driven configuration.

use std::env;

/// Runtime configuration, loaded once at startup and passed into every
/// component constructor. No component reads the environment on its own.
#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Root directory for per-asset storage (originals, HLS output, sidecars)
    pub media_root: String,
    /// Upload size cap in bytes, enforced incrementally while streaming
    pub max_upload_bytes: u64,
    /// Wall-clock limit for a single transcode run, in seconds
    pub transcode_timeout_secs: u64,
    /// Target HLS segment duration in seconds
    pub segment_seconds: u32,
    /// Admission limit for simultaneous transcode subprocesses
    pub max_concurrent_transcodes: usize,
    /// Path to the ffmpeg binary
    pub ffmpeg_path: String,
    /// Base URL prefixed to playable URLs; empty means root-relative
    pub public_base_url: String,
}

impl Config {
    /// Load configuration from environment variables, with defaults
    /// matching the reference deployment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("8000")),
            media_root: env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| String::from("./uploads/courses")),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100 * 1024 * 1024),
            transcode_timeout_secs: env::var("TRANSCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            segment_seconds: env::var("SEGMENT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            max_concurrent_transcodes: env::var("MAX_CONCURRENT_TRANSCODES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| String::from("ffmpeg")),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or_default(),
        }
    }
}
