//! Handlers for `/tasks` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/tasks` | Optional `?date=YYYY-MM-DD`, default today; carries over on today |
//! | `POST`   | `/tasks` | Body: `{"title", "task_date"?}` |
//! | `PATCH`  | `/tasks/{id}` | Body: any of `title`, `status`, `remarks` |
//! | `POST`   | `/tasks/{id}/verify` | Admin; body: `{"verified": bool}` |
//! | `DELETE` | `/tasks/{id}` | Admin |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use fieldsight_core::{
  carry_over::ensure_carry_over,
  profile::{Action, authorize},
  task::{DailyTask, NewDailyTask, TaskPatch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Backend, error::ApiError, session::Session, today};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub date: Option<NaiveDate>,
}

/// `GET /tasks[?date=YYYY-MM-DD]`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  _session: Session,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<DailyTask>>, ApiError> {
  let today = today();
  let date = params.date.unwrap_or(today);

  ensure_carry_over(state.store.as_ref(), date, today)
    .await
    .map_err(ApiError::store)?;
  let tasks = state.store.tasks_on(date).await.map_err(ApiError::store)?;
  Ok(Json(tasks))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:     String,
  pub task_date: Option<NaiveDate>,
}

/// `POST /tasks`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let title = body.title.trim();
  if title.is_empty() {
    return Err(fieldsight_core::Error::MissingField("title").into());
  }

  let task = NewDailyTask::new(
    title,
    body.task_date.unwrap_or_else(today),
    Some(session.profile.id),
  );
  let mut created = state
    .store
    .insert_tasks(vec![task])
    .await
    .map_err(ApiError::store)?;
  let task = created
    .pop()
    .ok_or_else(|| ApiError::Store("task insert returned nothing".into()))?;
  Ok((StatusCode::CREATED, Json(task)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /tasks/{id}`
pub async fn update<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(mut patch): Json<TaskPatch>,
) -> Result<Json<DailyTask>, ApiError> {
  if let Some(title) = &patch.title {
    let trimmed = title.trim();
    if trimmed.is_empty() {
      return Err(fieldsight_core::Error::MissingField("title").into());
    }
    patch.title = Some(trimmed.to_owned());
  }
  if patch.is_empty() {
    return Err(ApiError::BadRequest("nothing to update".into()));
  }

  apply(&state, id, patch, &session).await
}

// ─── Verify ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub verified: bool,
}

/// `POST /tasks/{id}/verify`
pub async fn verify<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<DailyTask>, ApiError> {
  authorize(Some(&session.profile), Action::VerifyTask)?;
  let patch = TaskPatch::verification(body.verified, Some(session.profile.id), Utc::now());
  apply(&state, id, patch, &session).await
}

async fn apply<S: Backend>(
  state: &AppState<S>,
  id: Uuid,
  patch: TaskPatch,
  session: &Session,
) -> Result<Json<DailyTask>, ApiError> {
  let task = state
    .store
    .update_task(id, patch, Some(session.profile.id))
    .await
    .map_err(ApiError::store)?
    .ok_or(fieldsight_core::Error::TaskNotFound(id))?;
  Ok(Json(task))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /tasks/{id}`
pub async fn delete_one<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  authorize(Some(&session.profile), Action::DeleteTask)?;
  if state.store.delete_task(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(fieldsight_core::Error::TaskNotFound(id).into())
  }
}
