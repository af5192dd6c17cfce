//! `GET /changes`: long-poll for the next write.
//!
//! The response carries no row data. Clients treat any notice as "refetch the
//! affected table". A `lagged` notice means events were dropped and the
//! client should refetch everything it shows.

use std::time::Duration;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fieldsight_core::store::{ChangeEvent, Topic};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

use crate::{AppState, Backend, error::ApiError, session::Session};

const DEFAULT_TIMEOUT_SECS: u64 = 25;
const MAX_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
pub struct ChangeParams {
  /// A log table name or `daily_tasks`; omitted means any.
  pub table:        Option<String>,
  pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
  Change(ChangeEvent),
  Lagged { missed: u64 },
}

/// `GET /changes[?table=<name>][&timeout_secs=<n>]`
///
/// 200 with a [`Notice`], or 204 when nothing happened before the timeout.
pub async fn next<S: Backend>(
  State(state): State<AppState<S>>,
  _session: Session,
  Query(params): Query<ChangeParams>,
) -> Result<Response, ApiError> {
  let topic = params
    .table
    .as_deref()
    .map(str::parse::<Topic>)
    .transpose()?;
  let wait = Duration::from_secs(
    params
      .timeout_secs
      .unwrap_or(DEFAULT_TIMEOUT_SECS)
      .min(MAX_TIMEOUT_SECS),
  );

  let mut rx = state.store.subscribe();
  let notice = tokio::time::timeout(wait, async {
    loop {
      match rx.recv().await {
        Ok(event) if topic.is_none_or(|t| t == event.topic) => {
          return Some(Notice::Change(event));
        }
        Ok(_) => continue,
        Err(RecvError::Lagged(missed)) => return Some(Notice::Lagged { missed }),
        Err(RecvError::Closed) => return None,
      }
    }
  })
  .await
  .ok()
  .flatten();

  Ok(match notice {
    Some(notice) => Json(notice).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}
