//! Object storage for site photos.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/storage/{bucket}` | Raw body; optional `?ext=png`; returns `{path, public_url}` |
//! | `GET`  | `/storage/{bucket}/{path}` | Public; no auth |
//!
//! Files are content-addressed: the stored name is the SHA-256 of the body,
//! so uploading the same photo twice yields the same path.

use std::path::PathBuf;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{AppState, Backend, error::ApiError, session::Session};

const MAX_EXT_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub ext: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uploaded {
  pub path:       String,
  pub public_url: String,
}

/// Bucket names and stored file names: ASCII alphanumerics plus `-`, `_`
/// and (file names only) a single `.`.
fn valid_segment(s: &str, allow_dot: bool) -> bool {
  !s.is_empty()
    && !s.starts_with('.')
    && s.matches('.').count() <= usize::from(allow_dot)
    && s
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || (allow_dot && b == b'.'))
}

fn bucket_dir(root: &std::path::Path, bucket: &str) -> Result<PathBuf, ApiError> {
  if !valid_segment(bucket, false) {
    return Err(ApiError::BadRequest(format!("invalid bucket name: {bucket:?}")));
  }
  Ok(root.join(bucket))
}

pub fn public_url(base: &str, bucket: &str, path: &str) -> String {
  format!("{}/api/storage/{bucket}/{path}", base.trim_end_matches('/'))
}

fn content_type(path: &str) -> &'static str {
  let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
  match ext.as_deref() {
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("heic") => "image/heic",
    Some("pdf") => "application/pdf",
    _ => "application/octet-stream",
  }
}

/// `POST /storage/{bucket}[?ext=<ext>]`
pub async fn upload<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(bucket): Path<String>,
  Query(params): Query<UploadParams>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
  let dir = bucket_dir(&state.config.upload_dir, &bucket)?;
  if body.is_empty() {
    return Err(ApiError::BadRequest("empty upload".into()));
  }

  let digest = hex::encode(Sha256::digest(&body));
  let name = match params.ext.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
    Some(ext) if ext.len() <= MAX_EXT_LEN && ext.bytes().all(|b| b.is_ascii_alphanumeric()) => {
      format!("{digest}.{}", ext.to_ascii_lowercase())
    }
    Some(ext) => return Err(ApiError::BadRequest(format!("invalid extension: {ext:?}"))),
    None => digest,
  };

  tokio::fs::create_dir_all(&dir).await?;
  tokio::fs::write(dir.join(&name), &body).await?;
  tracing::info!(%bucket, %name, bytes = body.len(), user = %session.profile.email, "file stored");

  let public_url = public_url(&state.config.public_base_url, &bucket, &name);
  Ok((StatusCode::CREATED, Json(Uploaded { path: name, public_url })))
}

/// `GET /storage/{bucket}/{path}`
pub async fn download<S: Backend>(
  State(state): State<AppState<S>>,
  Path((bucket, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
  let dir = bucket_dir(&state.config.upload_dir, &bucket)?;
  if !valid_segment(&path, true) {
    return Err(ApiError::BadRequest(format!("invalid path: {path:?}")));
  }

  let bytes = match tokio::fs::read(dir.join(&path)).await {
    Ok(b) => b,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(ApiError::NotFound(format!("{bucket}/{path} not found")));
    }
    Err(e) => return Err(e.into()),
  };
  Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes))
}
