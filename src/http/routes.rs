//! Request handlers and wire DTOs.

use super::error::ApiError;
use super::AppState;
use crate::asset::{Asset, AssetStatus};
use crate::catalog::{AssetProbe, CatalogError};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub lesson_id: Uuid,
    pub status: AssetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// One row of `GET /videos`. Every asset is listed with its status;
/// `videoUrl` is only present once the asset is `READY`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: Uuid,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub file_size: u64,
    pub duration: Option<f64>,
    pub status: AssetStatus,
}

/// Slack granted to the `Content-Length` fast-fail hint for multipart
/// framing (boundary lines and part headers) around the file bytes. A file
/// of exactly the cap must not be rejected because of its envelope.
const MULTIPART_FRAMING_ALLOWANCE: u64 = 16 * 1024;

/// Derive a file-size hint from the request's `Content-Length`. The header
/// counts the whole multipart body, so the framing allowance is subtracted
/// before the value is compared against the upload cap; the store's
/// byte-accurate check while streaming stays authoritative.
fn declared_file_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|body_len| body_len.saturating_sub(MULTIPART_FRAMING_ALLOWANCE))
}

fn playable_url(base: &str, id: Uuid) -> String {
    format!("{}/uploads/courses/{}/index.m3u8", base, id)
}

fn summarize(asset: Asset, base: &str) -> VideoSummary {
    let video_url = (asset.status == AssetStatus::Ready).then(|| playable_url(base, asset.id));
    VideoSummary {
        id: asset.id,
        filename: asset.original_name,
        video_url,
        uploaded_at: asset.uploaded_at,
        file_size: asset.original_size_bytes,
        duration: asset.duration_seconds,
        status: asset.status,
    }
}

/// `POST /upload`. Ingests the first file field of the multipart body. A
/// conversion failure still answers 200: the upload made it, the asset is
/// just recorded as `FAILED`, and nobody has to re-send a large file to
/// find out.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let declared_size = declared_file_size(&headers);

    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(filename) = field.file_name().map(String::from) else {
            continue;
        };

        let asset = state
            .ingest
            .ingest(field, &filename, declared_size)
            .await?;

        let (message, video_url) = if asset.status == AssetStatus::Ready {
            (
                String::from("Video uploaded and converted successfully"),
                Some(playable_url(&state.config.public_base_url, asset.id)),
            )
        } else {
            (String::from("Video uploaded but conversion failed"), None)
        };

        return Ok(Json(UploadResponse {
            message,
            lesson_id: asset.id,
            status: asset.status,
            video_url,
        }));
    }

    Err(ApiError::BadRequest(String::from("No file provided")))
}

/// `GET /videos`: every asset, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
) -> Result<Json<Vec<VideoSummary>>, ApiError> {
    let assets = state.catalog.list().await?;
    let base = state.config.public_base_url.as_str();
    Ok(Json(
        assets.into_iter().map(|a| summarize(a, base)).collect(),
    ))
}

/// `GET /video-status/:id`. 404 only when the asset's storage is entirely
/// absent, and even then the body is a full probe with `exists: false` so
/// a polling client can read one shape. An unparseable id cannot name any
/// stored asset.
pub async fn video_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    match state.catalog.status(id).await {
        Ok(probe) => Ok(Json(probe).into_response()),
        Err(CatalogError::NotFound(id)) => {
            Ok((StatusCode::NOT_FOUND, Json(absent_probe(id))).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn absent_probe(id: Uuid) -> AssetProbe {
    AssetProbe {
        id,
        exists: false,
        has_metadata: false,
        has_hls: false,
        is_complete: false,
        metadata: None,
    }
}

/// `DELETE /videos/:id`.
pub async fn delete_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    state.catalog.delete(id).await?;
    Ok(Json(json!({ "message": "Video deleted successfully" })))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(String::from("Video not found")))
}
