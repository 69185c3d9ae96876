//! The ingestion orchestrator.
//!
//! Drives one upload through its whole lifecycle: persist the original,
//! hand it to the transcode engine, and move the asset record forward
//! `Pending -> Transcoding -> {Ready, Failed}`, persisting every step. A
//! failed conversion is recorded, not rejected: the upload itself already
//! succeeded, and the caller gets the asset back in `Failed` state rather
//! than an error.

use crate::asset::{Asset, AssetStatus};
use crate::hls;
use crate::metadata::{MetadataError, MetadataRepository};
use crate::store::{sanitize_extension, AssetStore, StoreError};
use crate::transcode::{TranscodeEngine, TranscodeOutcome};
use axum::body::Bytes;
use axum::BoxError;
use futures::Stream;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no file provided")]
    NoFileProvided,
    #[error("file too large; maximum size is {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Orchestrates uploads end to end. One instance is shared by all request
/// handlers; per-upload state lives entirely on the stack and in storage.
pub struct IngestService<E> {
    store: AssetStore,
    metadata: MetadataRepository,
    engine: E,
    max_upload_bytes: u64,
    /// Admission limit for the CPU-heavy transcode step. Uploads stream in
    /// concurrently without limit; only engine runs queue here.
    transcode_slots: Arc<Semaphore>,
}

impl<E: TranscodeEngine> IngestService<E> {
    pub fn new(
        store: AssetStore,
        metadata: MetadataRepository,
        engine: E,
        max_upload_bytes: u64,
        max_concurrent_transcodes: usize,
    ) -> Self {
        Self {
            store,
            metadata,
            engine,
            max_upload_bytes,
            transcode_slots: Arc::new(Semaphore::new(max_concurrent_transcodes)),
        }
    }

    /// Ingest one upload. Validation failures reject before any storage
    /// write; a transcode failure still returns `Ok` with the asset in
    /// `Failed` state.
    pub async fn ingest<S, Err>(
        &self,
        stream: S,
        declared_filename: &str,
        declared_size: Option<u64>,
    ) -> Result<Asset, IngestError>
    where
        S: Stream<Item = Result<Bytes, Err>>,
        Err: Into<BoxError>,
    {
        if let Some(size) = declared_size {
            if size > self.max_upload_bytes {
                return Err(IngestError::PayloadTooLarge {
                    limit: self.max_upload_bytes,
                });
            }
        }

        let id = Uuid::new_v4();
        self.store
            .create_asset_dir(id)
            .await
            .map_err(IngestError::Store)?;

        let extension = sanitize_extension(declared_filename);
        let (original, written) = match self
            .store
            .write_original(id, &extension, stream, self.max_upload_bytes)
            .await
        {
            Ok(v) => v,
            Err(StoreError::PayloadTooLarge { limit }) => {
                self.discard(id).await;
                return Err(IngestError::PayloadTooLarge { limit });
            }
            Err(e) => {
                self.discard(id).await;
                return Err(IngestError::Store(e));
            }
        };
        if written == 0 {
            self.discard(id).await;
            return Err(IngestError::NoFileProvided);
        }

        let mut asset = Asset::new(id, declared_filename.to_owned(), written);
        asset.original_path = Some(format!("{}/original.{}", id, extension));
        self.metadata.save(&asset).await?;
        info!(asset_id = %id, bytes = written, "stored original upload");

        asset.advance(AssetStatus::Transcoding);
        self.metadata.save(&asset).await?;

        // The semaphore is owned by this service and never closed, so
        // acquire can only yield a permit; a closed-semaphore error would
        // mean proceeding without admission control, not failing the upload.
        let _permit = self.transcode_slots.acquire().await.ok();

        let output_dir = self.store.asset_dir(id);
        match self.engine.transcode(&original, &output_dir).await {
            Ok(report) if report.outcome.is_success() => {
                // Re-check the artifact; a deletion race or truncated engine
                // output must not produce a READY asset with no manifest.
                if self.store.manifest_len(id).await.unwrap_or(0) > 0 {
                    let manifest = self.store.manifest_file(id);
                    asset.duration_seconds = hls::playlist_duration(&manifest).await;
                    asset.advance(AssetStatus::Ready);
                    asset.manifest_path = Some(format!("{}/index.m3u8", id));
                    info!(asset_id = %id, duration = ?asset.duration_seconds, "transcode complete");
                } else {
                    error!(asset_id = %id, "engine reported success but manifest is missing");
                    asset.advance(AssetStatus::Failed);
                    asset.last_error = Some(String::from("transcoding produced no playable output"));
                }
            }
            Ok(report) => {
                let reason = match report.outcome {
                    TranscodeOutcome::TimedOut => "transcoding timed out",
                    _ => "transcoding failed",
                };
                // Raw engine output stays in the server log.
                error!(
                    asset_id = %id,
                    outcome = ?report.outcome,
                    diagnostics = %report.diagnostics,
                    "transcode failed"
                );
                asset.advance(AssetStatus::Failed);
                asset.last_error = Some(reason.to_owned());
            }
            Err(e) => {
                error!(asset_id = %id, error = %e, "could not launch transcode engine");
                asset.advance(AssetStatus::Failed);
                asset.last_error = Some(String::from("transcoding engine unavailable"));
            }
        }

        // The asset may have been deleted while the engine ran; a failed
        // terminal write aborts this ingestion without touching anyone else.
        if let Err(e) = self.metadata.save(&asset).await {
            warn!(asset_id = %id, error = %e, "asset vanished before terminal state could be persisted");
            return Err(e.into());
        }

        Ok(asset)
    }

    /// Best-effort removal of a partially written asset directory.
    async fn discard(&self, id: Uuid) {
        if let Err(e) = self.store.remove(id).await {
            warn!(asset_id = %id, error = %e, "failed to clean up partial upload");
        }
    }
}
