//! Filesystem-backed asset storage.
//!
//! One directory per asset id under the media root, holding the preserved
//! original, the HLS manifest and segments, and the metadata sidecar.

use axum::body::Bytes;
use axum::BoxError;
use futures::{Stream, TryStreamExt};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Name of the HLS manifest inside each asset directory.
pub const MANIFEST_FILE: &str = "index.m3u8";

/// Temporary name the upload body is streamed into before the final rename.
const INCOMING_FILE: &str = "incoming.part";

const COPY_BUF_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("payload exceeds the configured {limit} byte cap")]
    PayloadTooLarge { limit: u64 },
    #[error("asset directory already exists for {0}")]
    Collision(Uuid),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Durable storage keyed by asset id.
#[derive(Clone, Debug)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding everything belonging to one asset.
    pub fn asset_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn manifest_file(&self, id: Uuid) -> PathBuf {
        self.asset_dir(id).join(MANIFEST_FILE)
    }

    pub async fn dir_exists(&self, id: Uuid) -> bool {
        tokio::fs::metadata(self.asset_dir(id))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Byte length of the asset's manifest, or `None` if absent.
    pub async fn manifest_len(&self, id: Uuid) -> Option<u64> {
        tokio::fs::metadata(self.manifest_file(id))
            .await
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    /// Create the asset's directory. Ids are random 128-bit values, so an
    /// existing directory means something is badly wrong; it is reported
    /// rather than reused.
    pub async fn create_asset_dir(&self, id: Uuid) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;

        let dir = self.asset_dir(id);
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StoreError::Collision(id)),
            Err(e) => Err(StoreError::io(dir, e)),
        }
    }

    /// Stream the upload body into the asset directory, enforcing `cap`
    /// incrementally. The body lands in a temporary file that is renamed to
    /// `original.{ext}` only once fully written, so readers never observe a
    /// partial original. Returns the final path and the byte count.
    pub async fn write_original<S, E>(
        &self,
        id: Uuid,
        extension: &str,
        stream: S,
        cap: u64,
    ) -> Result<(PathBuf, u64), StoreError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let dir = self.asset_dir(id);
        let incoming = dir.join(INCOMING_FILE);
        let original = dir.join(format!("original.{}", extension));

        let body_with_io_error =
            stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        let body_reader = StreamReader::new(body_with_io_error);
        futures::pin_mut!(body_reader);

        let file = File::create(&incoming)
            .await
            .map_err(|e| StoreError::io(&incoming, e))?;
        let mut writer = BufWriter::new(file);

        let mut buf = vec![0u8; COPY_BUF_BYTES];
        let mut written: u64 = 0;
        loop {
            let n = body_reader
                .read(&mut buf)
                .await
                .map_err(|e| StoreError::io(&incoming, e))?;
            if n == 0 {
                break;
            }
            written += n as u64;
            if written > cap {
                return Err(StoreError::PayloadTooLarge { limit: cap });
            }
            writer
                .write_all(&buf[..n])
                .await
                .map_err(|e| StoreError::io(&incoming, e))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| StoreError::io(&incoming, e))?;

        tokio::fs::rename(&incoming, &original)
            .await
            .map_err(|e| StoreError::io(&original, e))?;

        Ok((original, written))
    }

    /// Remove the asset directory and everything in it. `Ok(false)` means
    /// there was nothing to remove, so retries stay idempotent.
    pub async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let dir = self.asset_dir(id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(dir, e)),
        }
    }
}

/// Reduce a client-supplied filename to a safe storage extension. The
/// filename itself is never used as a path component.
pub fn sanitize_extension(original_name: &str) -> String {
    let ext: String = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();

    if ext.is_empty() {
        String::from("bin")
    } else {
        ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use tempfile::tempdir;

    type E = std::io::Error;

    fn chunks(data: &[&'static str]) -> impl Stream<Item = Result<Bytes, E>> {
        stream::iter(
            data.iter()
                .map(|d| Ok::<Bytes, E>(Bytes::from_static(d.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn writes_original_under_cap() {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path());
        let id = Uuid::new_v4();
        store.create_asset_dir(id).await.unwrap();

        let (path, written) = store
            .write_original(id, "mov", chunks(&["hello ", "world"]), 1024)
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello world");
        assert!(path.ends_with("original.mov"));
        assert!(!store.asset_dir(id).join(INCOMING_FILE).exists());
    }

    #[tokio::test]
    async fn exactly_at_cap_succeeds() {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path());
        let id = Uuid::new_v4();
        store.create_asset_dir(id).await.unwrap();

        let result = store
            .write_original(id, "bin", chunks(&["12345"]), 5)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn one_byte_over_cap_aborts() {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path());
        let id = Uuid::new_v4();
        store.create_asset_dir(id).await.unwrap();

        let result = store
            .write_original(id, "bin", chunks(&["12345", "6"]), 5)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::PayloadTooLarge { limit: 5 })
        ));
    }

    #[tokio::test]
    async fn stream_error_is_reported() {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path());
        let id = Uuid::new_v4();
        store.create_asset_dir(id).await.unwrap();

        let broken = stream::iter(vec![Err::<Bytes, &str>("connection reset")]);
        let result = store.write_original(id, "bin", broken, 1024).await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
    }

    #[tokio::test]
    async fn create_asset_dir_rejects_collision() {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path());
        let id = Uuid::new_v4();

        store.create_asset_dir(id).await.unwrap();
        let second = store.create_asset_dir(id).await;
        assert!(matches!(second, Err(StoreError::Collision(c)) if c == id));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path());
        let id = Uuid::new_v4();
        store.create_asset_dir(id).await.unwrap();

        assert!(store.remove(id).await.unwrap());
        assert!(!store.remove(id).await.unwrap());
    }

    #[tokio::test]
    async fn manifest_len_reports_presence() {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path());
        let id = Uuid::new_v4();
        store.create_asset_dir(id).await.unwrap();

        assert_eq!(store.manifest_len(id).await, None);
        std::fs::write(store.manifest_file(id), "#EXTM3U\n").unwrap();
        assert_eq!(store.manifest_len(id).await, Some(8));
    }

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(sanitize_extension("lecture.mov"), "mov");
        assert_eq!(sanitize_extension("archive.tar.GZ"), "gz");
        assert_eq!(sanitize_extension("no_extension"), "bin");
        assert_eq!(sanitize_extension("../../etc/passwd"), "bin");
        assert_eq!(sanitize_extension("weird.m p4/.."), "bin");
        assert_eq!(sanitize_extension("clip.mp4;rm -rf"), "mp4rmrf");
    }
}
