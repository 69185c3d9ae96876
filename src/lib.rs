//! Lectern - lecture video backend.
//!
//! Ingests uploaded videos, converts them to single-rendition HLS with an
//! external ffmpeg subprocess, and serves a catalog for playback and
//! deletion.
//!
//! Layout:
//! - `asset`: the asset record and its forward-only lifecycle
//! - `store`: per-asset filesystem storage with capped streaming writes
//! - `metadata`: atomic `metadata.json` sidecars, the catalog's source of truth
//! - `hls`: manifest inspection (best-effort duration)
//! - `transcode`: the engine seam and the ffmpeg adapter
//! - `ingest`: the orchestrator driving `PENDING -> TRANSCODING -> {READY, FAILED}`
//! - `catalog`: listing, status probes, deletion
//! - `http`: axum routes, DTOs, the error boundary, static HLS delivery

pub mod asset;
pub mod catalog;
pub mod config;
pub mod hls;
pub mod http;
pub mod ingest;
pub mod metadata;
pub mod store;
pub mod transcode;
