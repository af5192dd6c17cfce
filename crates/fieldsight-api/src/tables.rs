//! Handlers for `/tables/{table}` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/tables/{table}` | Newest first |
//! | `POST`   | `/tables/{table}` | Body: a flat JSON row; validated before insert |
//! | `DELETE` | `/tables/{table}` | Admin; clears the table |
//! | `DELETE` | `/tables/{table}/{id}` | Admin; 404 if not found |
//! | `GET`    | `/tables/{table}/export` | Admin; CSV download |

use std::str::FromStr as _;

use axum::{
  Json,
  extract::{Path, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use fieldsight_core::{
  profile::{Action, authorize},
  record::{NewRecord, Record, Row},
  table::Table,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, Backend, error::ApiError, session::Session, today};

pub(crate) fn parse_table(name: &str) -> Result<Table, ApiError> {
  Table::from_str(name).map_err(|_| fieldsight_core::Error::UnknownTable(name.to_owned()).into())
}

// ─── List / create ───────────────────────────────────────────────────────────

/// `GET /tables/{table}`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  _session: Session,
  Path(table): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError> {
  let table = parse_table(&table)?;
  let records = state.store.list(table).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `POST /tables/{table}`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(table): Path<String>,
  Json(fields): Json<Row>,
) -> Result<impl IntoResponse, ApiError> {
  let table = parse_table(&table)?;
  let input = NewRecord::validated(table, Some(session.profile.id), fields)?;
  let record = state.store.insert(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Deletes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Cleared {
  pub deleted: u64,
}

/// `DELETE /tables/{table}`
pub async fn clear_all<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(table): Path<String>,
) -> Result<Json<Cleared>, ApiError> {
  let table = parse_table(&table)?;
  authorize(Some(&session.profile), Action::ClearAll)?;
  let deleted = state.store.clear_all(table).await.map_err(ApiError::store)?;
  Ok(Json(Cleared { deleted }))
}

/// `DELETE /tables/{table}/{id}`
pub async fn delete_one<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path((table, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
  let table = parse_table(&table)?;
  authorize(Some(&session.profile), Action::DeleteRecord)?;
  if state.store.delete(table, id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("{table} record {id} not found")))
  }
}

// ─── Export ──────────────────────────────────────────────────────────────────

/// `GET /tables/{table}/export`
pub async fn export<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(table): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  let table = parse_table(&table)?;
  authorize(Some(&session.profile), Action::Export)?;

  let records = state.store.list(table).await.map_err(ApiError::store)?;
  let body = fieldsight_csv::encode_records(&records, table.export_columns());
  let disposition = format!(
    "attachment; filename=\"{}\"",
    fieldsight_csv::download_file_name(table, today())
  );

  tracing::info!(%table, rows = records.len(), user = %session.profile.email, "table exported");
  Ok((
    [
      (header::CONTENT_TYPE, fieldsight_csv::CONTENT_TYPE.to_owned()),
      (header::CONTENT_DISPOSITION, disposition),
    ],
    body,
  ))
}
