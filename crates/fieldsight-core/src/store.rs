//! The `RecordStore` and `AccountStore` traits and the change feed types.
//!
//! The traits are implemented by storage backends (e.g.
//! `fieldsight-store-sqlite`). Higher layers (`fieldsight-api`) depend on this
//! abstraction, not on any concrete backend.

use std::{fmt, future::Future, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  Error,
  profile::{Profile, ProfileUpdate, Role},
  record::{NewRecord, Record},
  table::Table,
  task::{DailyTask, NewDailyTask, TaskPatch},
};

/// The sentinel a clear-all excludes; no stored record ever has this id.
pub const CLEAR_ALL_SENTINEL: Uuid = Uuid::nil();

// ─── Change feed ─────────────────────────────────────────────────────────────

/// What a change notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
  Log(Table),
  DailyTasks,
}

impl fmt::Display for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Log(table) => fmt::Display::fmt(table, f),
      Self::DailyTasks => f.write_str("daily_tasks"),
    }
  }
}

impl FromStr for Topic {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s == "daily_tasks" {
      return Ok(Self::DailyTasks);
    }
    Table::from_str(s)
      .map(Self::Log)
      .map_err(|_| Error::UnknownTable(s.to_owned()))
  }
}

impl TryFrom<String> for Topic {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<Topic> for String {
  fn from(t: Topic) -> Self { t.to_string() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
  Insert,
  Update,
  Delete,
}

/// Published after every successful write. Carries no row data: receivers
/// are expected to refetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub topic:     Topic,
  pub kind:      ChangeKind,
  /// `None` for bulk deletes.
  pub id:        Option<Uuid>,
  /// Set for daily-task changes.
  pub task_date: Option<NaiveDate>,
}

// ─── Record store ────────────────────────────────────────────────────────────

/// Abstraction over the site-log backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Log tables ────────────────────────────────────────────────────────

  /// Every record of `table`, newest `created_at` first.
  fn list(
    &self,
    table: Table,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  /// Persist a record. `id` and `created_at` are set by the store.
  fn insert(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Delete one record. Returns `false` if it did not exist.
  fn delete(
    &self,
    table: Table,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete every record of `table` whose id is not [`CLEAR_ALL_SENTINEL`].
  ///
  /// One unconditional statement; inserts racing with it may or may not
  /// survive. Returns the number of rows removed.
  fn clear_all(
    &self,
    table: Table,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Daily tasks ───────────────────────────────────────────────────────

  /// Tasks dated `date`, oldest `created_at` first.
  fn tasks_on(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DailyTask>, Self::Error>> + Send + '_;

  /// The most recent task date, optionally restricted to dates strictly
  /// before `before`.
  fn latest_task_date(
    &self,
    before: Option<NaiveDate>,
  ) -> impl Future<Output = Result<Option<NaiveDate>, Self::Error>> + Send + '_;

  /// Insert tasks, unverified and without remarks.
  fn insert_tasks(
    &self,
    tasks: Vec<NewDailyTask>,
  ) -> impl Future<Output = Result<Vec<DailyTask>, Self::Error>> + Send + '_;

  /// Copy the unfinished tasks of the latest date before `today` to `today`
  /// (see [`crate::carry_over::plan_carry_over`]). Reading, planning and
  /// inserting happen in one transaction, so concurrent calls never copy the
  /// same root twice. Returns the tasks inserted.
  fn carry_over(
    &self,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DailyTask>, Self::Error>> + Send + '_;

  /// Apply a partial update, stamping `updated_at` and `updated_by`.
  /// Returns `None` if the task does not exist.
  fn update_task(
    &self,
    id: Uuid,
    patch: TaskPatch,
    updated_by: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<DailyTask>, Self::Error>> + Send + '_;

  fn delete_task(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Change feed ───────────────────────────────────────────────────────

  /// Subscribe to change notifications for every write made through this
  /// store.
  fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

// ─── Account store ───────────────────────────────────────────────────────────

/// A stored login: the profile plus its password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub profile:       Profile,
  /// PHC string produced by argon2.
  pub password_hash: String,
}

/// Accounts, profiles and sessions.
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create an account and its profile. Returns `None` if the email is
  /// already registered.
  fn create_account(
    &self,
    email: String,
    password_hash: String,
    role: Role,
    full_name: Option<String>,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  fn credentials(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  fn update_profile(
    &self,
    id: Uuid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Record a session keyed by the hash of its bearer token.
  fn create_session(
    &self,
    token_hash: String,
    profile_id: Uuid,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The profile behind an unexpired session.
  fn resolve_session(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Remove a session. Returns `false` if it did not exist.
  fn revoke_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
