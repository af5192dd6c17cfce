//! HTTP server assembly for FieldSight.
//!
//! Loads [`ServerConfig`], opens the SQLite store and mounts the JSON API
//! under `/api` with request tracing.

use std::path::{Path, PathBuf};

use axum::Router;
use fieldsight_api::{ApiConfig, AppState, Backend};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `FIELDSIGHT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  /// Defaults to `http://{host}:{port}`.
  pub public_base_url:   Option<String>,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  #[serde(default = "default_upload_dir")]
  pub upload_dir:        PathBuf,
  #[serde(default)]
  pub admin_emails:      Vec<String>,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("fieldsight.db") }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_session_ttl_hours() -> i64 { 24 * 7 }

impl ServerConfig {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("FIELDSIGHT")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("admin_emails"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      public_base_url:   self
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", self.address())),
      upload_dir:        expand_tilde(&self.upload_dir),
      admin_emails:      self.admin_emails.clone(),
      session_ttl_hours: self.session_ttl_hours,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The complete application: the API under `/api`, wrapped in request
/// tracing.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  Router::new()
    .nest("/api", fieldsight_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}
