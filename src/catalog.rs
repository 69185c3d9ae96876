//! The asset catalog: listing, status probes, deletion.

use crate::asset::{Asset, AssetStatus};
use crate::metadata::{MetadataError, MetadataRepository};
use crate::store::{AssetStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no asset with id {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// What actually exists on disk for one asset, alongside its record. The
/// checks are independent so operators can see partially broken assets
/// (say, a sidecar whose manifest was hand-deleted) for what they are.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProbe {
    pub id: Uuid,
    pub exists: bool,
    pub has_metadata: bool,
    #[serde(rename = "hasHLS")]
    pub has_hls: bool,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Asset>,
}

/// Read-and-delete side of the asset lifecycle.
#[derive(Clone, Debug)]
pub struct CatalogService {
    store: AssetStore,
    metadata: MetadataRepository,
}

impl CatalogService {
    pub fn new(store: AssetStore, metadata: MetadataRepository) -> Self {
        Self { store, metadata }
    }

    /// Point-in-time listing of every readable asset, newest first, ties
    /// broken by id so the order is deterministic.
    pub async fn list(&self) -> Result<Vec<Asset>, CatalogError> {
        let mut assets = self.metadata.list_all().await?;
        assets.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(assets)
    }

    /// Inspect one asset's storage. `NotFound` only when the directory is
    /// entirely absent; a directory with missing pieces still gets a probe.
    pub async fn status(&self, id: Uuid) -> Result<AssetProbe, CatalogError> {
        if !self.store.dir_exists(id).await {
            return Err(CatalogError::NotFound(id));
        }

        let metadata = match self.metadata.load(id).await {
            Ok(asset) => Some(asset),
            Err(MetadataError::NotFound(_)) | Err(MetadataError::Corrupt(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let has_hls = self.store.manifest_len(id).await.unwrap_or(0) > 0;
        let is_complete = has_hls
            && metadata
                .as_ref()
                .map(|a| a.status == AssetStatus::Ready)
                .unwrap_or(false);

        Ok(AssetProbe {
            id,
            exists: true,
            has_metadata: metadata.is_some(),
            has_hls,
            is_complete,
            metadata,
        })
    }

    /// Remove the asset and everything it owns as one unit: original,
    /// segments, manifest, sidecar. Idempotent under retry; the second
    /// delete of an id sees `NotFound`.
    pub async fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
        if self.store.remove(id).await? {
            info!(asset_id = %id, "deleted asset");
            Ok(())
        } else {
            Err(CatalogError::NotFound(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SIDECAR_FILE;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn services(root: &std::path::Path) -> (AssetStore, MetadataRepository, CatalogService) {
        let store = AssetStore::new(root);
        let metadata = MetadataRepository::new(store.clone());
        let catalog = CatalogService::new(store.clone(), metadata.clone());
        (store, metadata, catalog)
    }

    async fn asset_uploaded_at(
        store: &AssetStore,
        repo: &MetadataRepository,
        minutes_ago: i64,
    ) -> Asset {
        let mut asset = Asset::new(Uuid::new_v4(), "clip.mp4".into(), 10);
        asset.uploaded_at = Utc::now() - Duration::minutes(minutes_ago);
        store.create_asset_dir(asset.id).await.unwrap();
        repo.save(&asset).await.unwrap();
        asset
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let tmp = tempdir().unwrap();
        let (store, repo, catalog) = services(tmp.path());
        let old = asset_uploaded_at(&store, &repo, 30).await;
        let newest = asset_uploaded_at(&store, &repo, 1).await;
        let middle = asset_uploaded_at(&store, &repo, 10).await;

        let listed = catalog.list().await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![newest.id, middle.id, old.id]);
    }

    #[tokio::test]
    async fn equal_timestamps_order_by_id() {
        let tmp = tempdir().unwrap();
        let (store, repo, catalog) = services(tmp.path());
        let when = Utc::now();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let mut asset = Asset::new(Uuid::new_v4(), "tie.mp4".into(), 1);
            asset.uploaded_at = when;
            store.create_asset_dir(asset.id).await.unwrap();
            repo.save(&asset).await.unwrap();
            ids.push(asset.id);
        }
        ids.sort();

        let listed: Vec<Uuid> = catalog.list().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn listing_survives_one_corrupt_sidecar() {
        let tmp = tempdir().unwrap();
        let (store, repo, catalog) = services(tmp.path());
        let good = asset_uploaded_at(&store, &repo, 1).await;
        let bad = asset_uploaded_at(&store, &repo, 2).await;
        std::fs::write(store.asset_dir(bad.id).join(SIDECAR_FILE), b"garbage").unwrap();

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, good.id);
    }

    #[tokio::test]
    async fn status_reports_each_artifact() {
        let tmp = tempdir().unwrap();
        let (store, repo, catalog) = services(tmp.path());
        let mut asset = asset_uploaded_at(&store, &repo, 1).await;

        let probe = catalog.status(asset.id).await.unwrap();
        assert!(probe.exists && probe.has_metadata);
        assert!(!probe.has_hls && !probe.is_complete);

        std::fs::write(store.manifest_file(asset.id), "#EXTM3U\n").unwrap();
        asset.advance(AssetStatus::Transcoding);
        asset.advance(AssetStatus::Ready);
        repo.save(&asset).await.unwrap();

        let probe = catalog.status(asset.id).await.unwrap();
        assert!(probe.has_hls && probe.is_complete);
        assert_eq!(
            probe.metadata.map(|a| a.status),
            Some(AssetStatus::Ready)
        );
    }

    #[tokio::test]
    async fn status_of_absent_asset_is_not_found() {
        let tmp = tempdir().unwrap();
        let (_store, _repo, catalog) = services(tmp.path());
        let id = Uuid::new_v4();
        assert!(matches!(
            catalog.status(id).await,
            Err(CatalogError::NotFound(n)) if n == id
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let tmp = tempdir().unwrap();
        let (store, repo, catalog) = services(tmp.path());
        let asset = asset_uploaded_at(&store, &repo, 1).await;

        catalog.delete(asset.id).await.unwrap();
        assert!(matches!(
            catalog.delete(asset.id).await,
            Err(CatalogError::NotFound(_))
        ));
        // storage and sidecar went together
        assert!(!store.asset_dir(asset.id).exists());
    }

    #[tokio::test]
    async fn deleted_asset_leaves_the_listing() {
        let tmp = tempdir().unwrap();
        let (store, repo, catalog) = services(tmp.path());
        let keep = asset_uploaded_at(&store, &repo, 1).await;
        let drop = asset_uploaded_at(&store, &repo, 2).await;

        catalog.delete(drop.id).await.unwrap();
        let listed = catalog.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep.id);
    }
}
