//! Unauthenticated landing-page data.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/public/dashboard` | Headline numbers and chart series |
//! | `GET`  | `/public/tasks` | Tasks of the most recent task date |
//!
//! The dashboard is served from [`SiteSnapshot`], which keeps every log table
//! in memory and refetches a table whenever it changes.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, NaiveDate, Utc};
use fieldsight_core::{
  aggregate::{DashboardInput, DashboardSummary},
  live::LiveTable,
  record::{Record, Row},
  store::RecordStore,
  table::Table,
  task::{DailyTask, TaskStatus},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Backend, error::ApiError, today};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Live copies of the five log tables.
pub struct SiteSnapshot<S> {
  concrete:  Arc<LiveTable<S>>,
  manpower:  Arc<LiveTable<S>>,
  issues:    Arc<LiveTable<S>>,
  materials: Arc<LiveTable<S>>,
  bbs:       Arc<LiveTable<S>>,
}

impl<S: RecordStore + 'static> SiteSnapshot<S> {
  pub async fn open(store: Arc<S>) -> Result<Self, S::Error> {
    Ok(Self {
      concrete:  LiveTable::open(Arc::clone(&store), Table::Concrete).await?,
      manpower:  LiveTable::open(Arc::clone(&store), Table::Manpower).await?,
      issues:    LiveTable::open(Arc::clone(&store), Table::Issues).await?,
      materials: LiveTable::open(Arc::clone(&store), Table::Materials).await?,
      bbs:       LiveTable::open(store, Table::BbsSchedule).await?,
    })
  }

  /// Force a refetch of every table.
  pub async fn refresh(&self) -> Result<(), S::Error> {
    for live in self.tables() {
      live.refresh().await?;
    }
    Ok(())
  }

  pub async fn summary(&self, today: NaiveDate) -> DashboardSummary {
    let concrete = rows(&self.concrete).await;
    let manpower = rows(&self.manpower).await;
    let issues = rows(&self.issues).await;
    let materials = rows(&self.materials).await;
    let bbs = rows(&self.bbs).await;

    DashboardSummary::build(
      DashboardInput {
        concrete:  &concrete,
        manpower:  &manpower,
        issues:    &issues,
        materials: &materials,
        bbs:       &bbs,
      },
      today,
    )
  }

  fn tables(&self) -> [&Arc<LiveTable<S>>; 5] {
    [&self.concrete, &self.manpower, &self.issues, &self.materials, &self.bbs]
  }
}

async fn rows<S: RecordStore + 'static>(live: &LiveTable<S>) -> Vec<Row> {
  live.rows().await.iter().map(Record::to_row).collect()
}

/// `GET /public/dashboard`
pub async fn dashboard<S: Backend>(State(state): State<AppState<S>>) -> Json<DashboardSummary> {
  Json(state.site.summary(today()).await)
}

// ─── Task snapshot ───────────────────────────────────────────────────────────

/// A task as shown to anonymous visitors: no account ids, only the display
/// name of whoever last touched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTask {
  pub title:           String,
  pub status:          TaskStatus,
  pub verified:        bool,
  pub remarks:         Option<String>,
  pub updated_at:      Option<DateTime<Utc>>,
  pub updated_by_name: Option<String>,
}

impl From<DailyTask> for PublicTask {
  fn from(t: DailyTask) -> Self {
    Self {
      title:           t.title,
      status:          t.status,
      verified:        t.verified,
      remarks:         t.remarks,
      updated_at:      t.updated_at,
      updated_by_name: t.updated_by_name,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
  /// `None` when no task has ever been recorded.
  pub date:  Option<NaiveDate>,
  pub tasks: Vec<PublicTask>,
}

/// `GET /public/tasks`
pub async fn tasks<S: Backend>(
  State(state): State<AppState<S>>,
) -> Result<Json<TaskSnapshot>, ApiError> {
  let Some(date) = state.store.latest_task_date(None).await.map_err(ApiError::store)? else {
    return Ok(Json(TaskSnapshot { date: None, tasks: Vec::new() }));
  };
  let tasks = state.store.tasks_on(date).await.map_err(ApiError::store)?;
  Ok(Json(TaskSnapshot {
    date:  Some(date),
    tasks: tasks.into_iter().map(PublicTask::from).collect(),
  }))
}
