//! JSON REST API for FieldSight.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`RecordStore`] and [`AccountStore`]. TLS and process concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = AppState::new(store, config).await?;
//! Router::new().nest("/api", fieldsight_api::api_router(state))
//! ```

pub mod auth;
pub mod changes;
pub mod error;
pub mod public;
pub mod session;
pub mod storage;
pub mod tables;
pub mod tasks;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{delete, get, post},
};
use chrono::{NaiveDate, Utc};
use fieldsight_core::store::{AccountStore, RecordStore};
use serde::Deserialize;

pub use error::ApiError;
pub use public::SiteSnapshot;
pub use session::Session;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// A store the API can serve from.
pub trait Backend: RecordStore + AccountStore + 'static {}

impl<T: RecordStore + AccountStore + 'static> Backend for T {}

// ─── Configuration ────────────────────────────────────────────────────────────

/// The parts of the server configuration the API itself needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Externally visible origin, used to build public file URLs.
  pub public_base_url:   String,
  /// Root directory for uploaded files; one subdirectory per bucket.
  pub upload_dir:        PathBuf,
  /// Accounts signing up with one of these addresses become admins.
  #[serde(default)]
  pub admin_emails:      Vec<String>,
  pub session_ttl_hours: i64,
}

impl ApiConfig {
  pub fn is_admin_email(&self, email: &str) -> bool {
    self.admin_emails.iter().any(|a| a.trim().eq_ignore_ascii_case(email))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
  /// Live copies of the log tables feeding the public dashboard.
  pub site:   Arc<SiteSnapshot<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
      site:   Arc::clone(&self.site),
    }
  }
}

impl<S: Backend> AppState<S> {
  pub async fn new(
    store: Arc<S>,
    config: ApiConfig,
  ) -> Result<Self, <S as RecordStore>::Error> {
    let site = SiteSnapshot::open(Arc::clone(&store)).await?;
    Ok(Self { store, config: Arc::new(config), site: Arc::new(site) })
  }
}

/// The calendar day on the server, in UTC.
pub fn today() -> NaiveDate { Utc::now().date_naive() }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Auth
    .route("/auth/sign-up", post(auth::sign_up::<S>))
    .route("/auth/sign-in", post(auth::sign_in::<S>))
    .route("/auth/sign-out", post(auth::sign_out::<S>))
    .route("/auth/me", get(auth::me::<S>).patch(auth::update_me::<S>))
    // Log tables
    .route(
      "/tables/{table}",
      get(tables::list::<S>)
        .post(tables::create::<S>)
        .delete(tables::clear_all::<S>),
    )
    .route("/tables/{table}/export", get(tables::export::<S>))
    .route("/tables/{table}/{id}", delete(tables::delete_one::<S>))
    // Daily tasks
    .route("/tasks", get(tasks::list::<S>).post(tasks::create::<S>))
    .route(
      "/tasks/{id}",
      axum::routing::patch(tasks::update::<S>).delete(tasks::delete_one::<S>),
    )
    .route("/tasks/{id}/verify", post(tasks::verify::<S>))
    // Public landing data
    .route("/public/dashboard", get(public::dashboard::<S>))
    .route("/public/tasks", get(public::tasks::<S>))
    // Realtime
    .route("/changes", get(changes::next::<S>))
    // Storage
    .route(
      "/storage/{bucket}",
      post(storage::upload::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
    .route("/storage/{bucket}/{path}", get(storage::download::<S>))
    .with_state(state)
}
