//! The daily task checklist.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
  #[default]
  Ongoing,
  Completed,
  Rejected,
}

/// One checklist item for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTask {
  pub id:              Uuid,
  pub title:           String,
  pub task_date:       NaiveDate,
  pub status:          TaskStatus,
  pub verified:        bool,
  pub verified_by:     Option<Uuid>,
  pub verified_at:     Option<DateTime<Utc>>,
  pub remarks:         Option<String>,
  /// Root of the carry-over chain this task was copied from.
  pub carry_over_from: Option<Uuid>,
  pub user_id:         Option<Uuid>,
  pub updated_by:      Option<Uuid>,
  /// Display name of `updated_by`, resolved by the store.
  #[serde(default)]
  pub updated_by_name: Option<String>,
  pub updated_at:      Option<DateTime<Utc>>,
  pub created_at:      DateTime<Utc>,
}

impl DailyTask {
  /// The id a copy of this task should point back to: the chain collapses to
  /// its first task.
  pub fn carry_over_root(&self) -> Uuid { self.carry_over_from.unwrap_or(self.id) }
}

/// Input to [`crate::store::RecordStore::insert_tasks`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewDailyTask {
  pub title:           String,
  pub task_date:       NaiveDate,
  pub status:          TaskStatus,
  pub carry_over_from: Option<Uuid>,
  pub user_id:         Option<Uuid>,
  pub updated_by:      Option<Uuid>,
}

impl NewDailyTask {
  /// A fresh `ongoing` task created by `user_id`.
  pub fn new(title: impl Into<String>, task_date: NaiveDate, user_id: Option<Uuid>) -> Self {
    Self {
      title: title.into(),
      task_date,
      status: TaskStatus::Ongoing,
      carry_over_from: None,
      user_id,
      updated_by: user_id,
    }
  }
}

/// A partial update. `None` leaves a field untouched; the nested options on
/// nullable columns distinguish "clear" (`Some(None)`) from "keep".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
  pub title:       Option<String>,
  pub status:      Option<TaskStatus>,
  #[serde(default, deserialize_with = "double_option")]
  pub remarks:     Option<Option<String>>,
  /// Verification is only set through [`TaskPatch::verification`].
  #[serde(skip)]
  pub verified:    Option<bool>,
  #[serde(skip)]
  pub verified_by: Option<Option<Uuid>>,
  #[serde(skip)]
  pub verified_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
  /// The patch applied by a verify / un-verify action.
  pub fn verification(verified: bool, by: Option<Uuid>, at: DateTime<Utc>) -> Self {
    if verified {
      Self {
        verified: Some(true),
        verified_by: Some(by),
        verified_at: Some(Some(at)),
        ..Default::default()
      }
    } else {
      Self {
        verified: Some(false),
        verified_by: Some(None),
        verified_at: Some(None),
        ..Default::default()
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.status.is_none()
      && self.remarks.is_none()
      && self.verified.is_none()
      && self.verified_by.is_none()
      && self.verified_at.is_none()
  }
}

fn double_option<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  Option::<String>::deserialize(d).map(Some)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn patch_distinguishes_clear_from_absent() {
    let keep: TaskPatch = serde_json::from_value(json!({ "status": "completed" })).unwrap();
    assert_eq!(keep.status, Some(TaskStatus::Completed));
    assert!(keep.remarks.is_none());

    let clear: TaskPatch = serde_json::from_value(json!({ "remarks": null })).unwrap();
    assert_eq!(clear.remarks, Some(None));
  }

  #[test]
  fn verification_patch_clears_on_unverify() {
    let patch = TaskPatch::verification(false, Some(Uuid::new_v4()), Utc::now());
    assert_eq!(patch.verified, Some(false));
    assert_eq!(patch.verified_by, Some(None));
    assert_eq!(patch.verified_at, Some(None));
  }

  #[test]
  fn root_falls_back_to_own_id() {
    let id = Uuid::new_v4();
    let root = Uuid::new_v4();
    let mut task = DailyTask {
      id,
      title: "Pour slab".into(),
      task_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
      status: TaskStatus::Ongoing,
      verified: false,
      verified_by: None,
      verified_at: None,
      remarks: None,
      carry_over_from: None,
      user_id: None,
      updated_by: None,
      updated_by_name: None,
      updated_at: None,
      created_at: Utc::now(),
    };
    assert_eq!(task.carry_over_root(), id);
    task.carry_over_from = Some(root);
    assert_eq!(task.carry_over_root(), root);
  }
}
