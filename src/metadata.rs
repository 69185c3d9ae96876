//! The per-asset metadata sidecar: save, load, list.
//!
//! One `metadata.json` per asset directory is the single source of truth
//! for the catalog. Writes go through a temp file and an atomic rename so
//! a concurrent reader never sees a torn record.

use crate::asset::Asset;
use crate::store::AssetStore;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Name of the sidecar file inside each asset directory.
pub const SIDECAR_FILE: &str = "metadata.json";

const SIDECAR_TMP: &str = "metadata.json.tmp";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("no metadata record for {0}")]
    NotFound(Uuid),
    #[error("invalid metadata record: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads and writes the sidecar records under an [`AssetStore`].
#[derive(Clone, Debug)]
pub struct MetadataRepository {
    store: AssetStore,
}

impl MetadataRepository {
    pub fn new(store: AssetStore) -> Self {
        Self { store }
    }

    fn sidecar_path(&self, id: Uuid) -> PathBuf {
        self.store.asset_dir(id).join(SIDECAR_FILE)
    }

    /// Persist the record. Atomic with respect to readers: the new content
    /// is written to a temp file first and renamed over the old sidecar.
    pub async fn save(&self, asset: &Asset) -> Result<(), MetadataError> {
        let tmp = self.store.asset_dir(asset.id).join(SIDECAR_TMP);
        let path = self.sidecar_path(asset.id);

        let json = serde_json::to_vec_pretty(asset)?;
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| MetadataError::Io {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| MetadataError::Io { path, source: e })?;
        Ok(())
    }

    pub async fn load(&self, id: Uuid) -> Result<Asset, MetadataError> {
        let path = self.sidecar_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MetadataError::NotFound(id))
            }
            Err(e) => return Err(MetadataError::Io { path, source: e }),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Delete just the sidecar. Whole-asset deletion goes through
    /// [`AssetStore::remove`], which takes the sidecar with the directory.
    pub async fn delete(&self, id: Uuid) -> Result<(), MetadataError> {
        let path = self.sidecar_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(MetadataError::NotFound(id)),
            Err(e) => Err(MetadataError::Io { path, source: e }),
        }
    }

    /// Snapshot of every readable record under the media root, in directory
    /// order. An unreadable or corrupt entry is logged and skipped rather
    /// than failing the whole listing; a directory deleted mid-scan is
    /// skipped the same way.
    pub async fn list_all(&self) -> Result<Vec<Asset>, MetadataError> {
        let root = self.store.root().to_path_buf();
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            // A media root that does not exist yet is an empty catalog.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MetadataError::Io { path: root, source: e }),
        };

        let mut assets = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MetadataError::Io {
                path: root.clone(),
                source: e,
            })?
        {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|s| Uuid::parse_str(s).ok()) else {
                continue;
            };
            match self.load(id).await {
                Ok(asset) => assets.push(asset),
                Err(MetadataError::NotFound(_)) => continue,
                Err(e) => {
                    warn!(asset_id = %id, error = %e, "skipping unreadable metadata record");
                }
            }
        }
        Ok(assets)
    }
}
