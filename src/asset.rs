//! The asset record and its lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an asset. Transitions only move forward:
/// `Pending -> Transcoding -> {Ready, Failed}`. Terminal states never
/// change; a failed conversion needs a brand-new upload (and id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetStatus {
    Pending,
    Transcoding,
    Ready,
    Failed,
}

impl AssetStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AssetStatus::Ready | AssetStatus::Failed)
    }

    /// Whether moving from `self` to `next` respects the forward-only
    /// ordering of the lifecycle.
    pub fn can_transition_to(self, next: AssetStatus) -> bool {
        matches!(
            (self, next),
            (AssetStatus::Pending, AssetStatus::Transcoding)
                | (AssetStatus::Transcoding, AssetStatus::Ready)
                | (AssetStatus::Transcoding, AssetStatus::Failed)
        )
    }
}

/// One uploaded video and its derived playable artifacts.
///
/// Persisted as the `metadata.json` sidecar inside the asset's storage
/// directory; also serialized directly into status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Opaque unique identifier, also the storage directory name.
    pub id: Uuid,
    /// Client-supplied filename. Display only, never a path component.
    pub original_name: String,
    pub original_size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub status: AssetStatus,
    /// Best-effort duration summed from the manifest; `None` when unknown.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Location of the playable manifest, relative to the media root.
    #[serde(default)]
    pub manifest_path: Option<String>,
    /// Location of the preserved original, relative to the media root.
    #[serde(default)]
    pub original_path: Option<String>,
    /// Sanitized failure summary; present only when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Asset {
    /// A freshly ingested asset in `Pending` state.
    pub fn new(id: Uuid, original_name: String, original_size_bytes: u64) -> Self {
        Self {
            id,
            original_name,
            original_size_bytes,
            uploaded_at: Utc::now(),
            status: AssetStatus::Pending,
            duration_seconds: None,
            manifest_path: None,
            original_path: None,
            last_error: None,
        }
    }

    /// Advance the lifecycle. Returns `false` (and leaves the record
    /// untouched) if the transition would move backwards or out of a
    /// terminal state.
    pub fn advance(&mut self, next: AssetStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }
}
