//! Carrying unfinished daily tasks forward to today.
//!
//! When today's checklist is opened, every task from the most recent earlier
//! day that was not completed is copied to today as a fresh `ongoing` task.
//! Copies point at the root of their chain, so a task carried for a week
//! still references the original, and a root already present today is never
//! copied twice.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  store::RecordStore,
  task::{DailyTask, NewDailyTask, TaskStatus},
};

/// Work out which of `previous` must be copied to `today`, given the tasks
/// already dated today.
pub fn plan_carry_over(
  previous: &[DailyTask],
  already_today: &[DailyTask],
  today: NaiveDate,
) -> Vec<NewDailyTask> {
  let mut seen: HashSet<Uuid> =
    already_today.iter().filter_map(|t| t.carry_over_from).collect();

  previous
    .iter()
    .filter(|t| t.task_date < today && t.status != TaskStatus::Completed)
    .filter_map(|t| {
      let root = t.carry_over_root();
      seen.insert(root).then(|| NewDailyTask {
        title:           t.title.clone(),
        task_date:       today,
        status:          TaskStatus::Ongoing,
        carry_over_from: Some(root),
        user_id:         t.user_id,
        updated_by:      None,
      })
    })
    .collect()
}

/// Run carry-over against `store` if `selected` is `today`. Returns the tasks
/// inserted, which is empty when there was nothing to do.
pub async fn ensure_carry_over<S: RecordStore>(
  store: &S,
  selected: NaiveDate,
  today: NaiveDate,
) -> Result<Vec<DailyTask>, S::Error> {
  if selected != today {
    return Ok(Vec::new());
  }

  let inserted = store.carry_over(today).await?;
  if !inserted.is_empty() {
    tracing::info!(to = %today, count = inserted.len(), "carried over unfinished tasks");
  }
  Ok(inserted)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 4, d).unwrap() }

  fn task(date: NaiveDate, status: TaskStatus, from: Option<Uuid>) -> DailyTask {
    DailyTask {
      id: Uuid::new_v4(),
      title: "Install formwork".into(),
      task_date: date,
      status,
      verified: true,
      verified_by: None,
      verified_at: None,
      remarks: Some("half done".into()),
      carry_over_from: from,
      user_id: Some(Uuid::new_v4()),
      updated_by: None,
      updated_by_name: None,
      updated_at: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn unfinished_tasks_are_copied_fresh() {
    let ongoing = task(day(9), TaskStatus::Ongoing, None);
    let rejected = task(day(9), TaskStatus::Rejected, None);
    let done = task(day(9), TaskStatus::Completed, None);

    let plan = plan_carry_over(&[ongoing.clone(), rejected.clone(), done], &[], day(10));
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].carry_over_from, Some(ongoing.id));
    assert_eq!(plan[0].status, TaskStatus::Ongoing);
    assert_eq!(plan[0].task_date, day(10));
    assert_eq!(plan[0].user_id, ongoing.user_id);
    assert_eq!(plan[0].updated_by, None);
    assert_eq!(plan[1].carry_over_from, Some(rejected.id));
  }

  #[test]
  fn chain_collapses_to_root() {
    let root = Uuid::new_v4();
    let carried = task(day(9), TaskStatus::Ongoing, Some(root));
    let plan = plan_carry_over(&[carried], &[], day(10));
    assert_eq!(plan[0].carry_over_from, Some(root));
  }

  #[test]
  fn existing_root_today_is_not_duplicated() {
    let prev = task(day(9), TaskStatus::Ongoing, None);
    let today_copy = task(day(10), TaskStatus::Ongoing, Some(prev.id));
    assert!(plan_carry_over(&[prev], &[today_copy], day(10)).is_empty());
  }

  #[test]
  fn shared_root_is_copied_once() {
    let root = Uuid::new_v4();
    let a = task(day(9), TaskStatus::Ongoing, Some(root));
    let b = task(day(9), TaskStatus::Rejected, Some(root));
    assert_eq!(plan_carry_over(&[a, b], &[], day(10)).len(), 1);
  }

  #[test]
  fn same_day_tasks_are_ignored() {
    let t = task(day(10), TaskStatus::Ongoing, None);
    assert!(plan_carry_over(&[t], &[], day(10)).is_empty());
  }
}
