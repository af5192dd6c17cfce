//! Integration tests for `SqliteStore` against an in-memory database.

use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use fieldsight_core::{
  carry_over::ensure_carry_over,
  entry::ConcreteEntry,
  live::LiveTable,
  profile::{ProfileUpdate, Role},
  record::{NewRecord, Row},
  store::{AccountStore, ChangeKind, RecordStore, Topic},
  table::Table,
  task::{NewDailyTask, TaskPatch, TaskStatus},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn row(v: Value) -> Row {
  match v {
    Value::Object(m) => m,
    _ => unreachable!(),
  }
}

fn pour(location: &str, volume: f64) -> NewRecord {
  let entry = ConcreteEntry {
    date: Some("2024-05-02".into()),
    location: Some(location.into()),
    volume: Some(volume),
    ..Default::default()
  };
  NewRecord::from_entry(None, &entry).unwrap()
}

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 4, d).unwrap() }

// ─── Log tables ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_then_list_newest_first() {
  let s = store().await;
  let first = s.insert(pour("Core A", 8.0)).await.unwrap();
  let second = s.insert(pour("Core B", 4.5)).await.unwrap();

  let listed = s.list(Table::Concrete).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].id, second.id);
  assert_eq!(listed[1].id, first.id);
  assert_eq!(listed[1].fields["location"], json!("Core A"));
  assert_eq!(listed[1].created_at, first.created_at);
}

#[tokio::test]
async fn tables_are_isolated() {
  let s = store().await;
  s.insert(pour("Core A", 8.0)).await.unwrap();
  let issue = NewRecord::validated(
    Table::Issues,
    Some(Uuid::new_v4()),
    row(json!({"date": "2024-05-02", "description": "Leak at L2"})),
  )
  .unwrap();
  let stored = s.insert(issue).await.unwrap();

  assert_eq!(s.list(Table::Concrete).await.unwrap().len(), 1);
  let issues = s.list(Table::Issues).await.unwrap();
  assert_eq!(issues.len(), 1);
  assert_eq!(issues[0].user_id, stored.user_id);
  assert!(s.list(Table::Manpower).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_one_record() {
  let s = store().await;
  let r = s.insert(pour("Core A", 8.0)).await.unwrap();

  assert!(!s.delete(Table::Issues, r.id).await.unwrap());
  assert!(s.delete(Table::Concrete, r.id).await.unwrap());
  assert!(!s.delete(Table::Concrete, r.id).await.unwrap());
  assert!(s.list(Table::Concrete).await.unwrap().is_empty());
}

#[tokio::test]
async fn clear_all_empties_only_that_table() {
  let s = store().await;
  for i in 0..3 {
    s.insert(pour(&format!("Bay {i}"), 1.0)).await.unwrap();
  }
  let manpower = NewRecord::validated(
    Table::Manpower,
    None,
    row(json!({"date": "2024-05-02", "contractor": "Acme", "workers": 12})),
  )
  .unwrap();
  s.insert(manpower).await.unwrap();

  assert_eq!(s.clear_all(Table::Concrete).await.unwrap(), 3);
  assert!(s.list(Table::Concrete).await.unwrap().is_empty());
  assert_eq!(s.list(Table::Manpower).await.unwrap().len(), 1);
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn writes_are_announced() {
  let s = store().await;
  let mut rx = s.subscribe();

  let r = s.insert(pour("Core A", 8.0)).await.unwrap();
  let ev = rx.recv().await.unwrap();
  assert_eq!(ev.topic, Topic::Log(Table::Concrete));
  assert_eq!(ev.kind, ChangeKind::Insert);
  assert_eq!(ev.id, Some(r.id));

  s.clear_all(Table::Concrete).await.unwrap();
  let ev = rx.recv().await.unwrap();
  assert_eq!(ev.kind, ChangeKind::Delete);
  assert_eq!(ev.id, None);

  let tasks = s
    .insert_tasks(vec![NewDailyTask::new("Strip formwork", day(3), None)])
    .await
    .unwrap();
  let ev = rx.recv().await.unwrap();
  assert_eq!(ev.topic, Topic::DailyTasks);
  assert_eq!(ev.id, Some(tasks[0].id));
  assert_eq!(ev.task_date, Some(day(3)));
}

#[tokio::test]
async fn live_table_refetches_on_change() {
  let s = Arc::new(store().await);
  s.insert(pour("Core A", 8.0)).await.unwrap();

  let live = LiveTable::open(Arc::clone(&s), Table::Concrete).await.unwrap();
  assert_eq!(live.rows().await.len(), 1);

  s.insert(pour("Core B", 2.0)).await.unwrap();
  // Unrelated writes do not disturb the snapshot.
  s.insert_tasks(vec![NewDailyTask::new("Unrelated", day(1), None)])
    .await
    .unwrap();

  let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
  while live.rows().await.len() != 2 {
    assert!(tokio::time::Instant::now() < deadline, "live table never refreshed");
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  assert_eq!(live.rows().await[0].fields["location"], json!("Core B"));
}

// ─── Daily tasks ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn tasks_on_date_oldest_first() {
  let s = store().await;
  let created = s
    .insert_tasks(vec![
      NewDailyTask::new("Rebar inspection", day(2), None),
      NewDailyTask::new("Pour slab", day(2), None),
      NewDailyTask::new("Other day", day(3), None),
    ])
    .await
    .unwrap();

  let on_two = s.tasks_on(day(2)).await.unwrap();
  assert_eq!(on_two.len(), 2);
  assert_eq!(on_two[0].id, created[0].id);
  assert_eq!(on_two[1].title, "Pour slab");
  assert!(!on_two[0].verified);
  assert_eq!(on_two[0].status, TaskStatus::Ongoing);
}

#[tokio::test]
async fn latest_task_date_respects_bound() {
  let s = store().await;
  assert_eq!(s.latest_task_date(None).await.unwrap(), None);

  s.insert_tasks(vec![
    NewDailyTask::new("a", day(2), None),
    NewDailyTask::new("b", day(5), None),
  ])
  .await
  .unwrap();

  assert_eq!(s.latest_task_date(None).await.unwrap(), Some(day(5)));
  assert_eq!(s.latest_task_date(Some(day(5))).await.unwrap(), Some(day(2)));
  assert_eq!(s.latest_task_date(Some(day(2))).await.unwrap(), None);
}

#[tokio::test]
async fn update_task_stamps_editor() {
  let s = store().await;
  let task = s
    .insert_tasks(vec![NewDailyTask::new("Pour slab", day(2), None)])
    .await
    .unwrap()
    .remove(0);
  let editor = Uuid::new_v4();

  let patch = TaskPatch {
    status: Some(TaskStatus::Completed),
    remarks: Some(Some("done by noon".into())),
    ..Default::default()
  };
  let updated = s.update_task(task.id, patch, Some(editor)).await.unwrap().unwrap();
  assert_eq!(updated.status, TaskStatus::Completed);
  assert_eq!(updated.remarks.as_deref(), Some("done by noon"));
  assert_eq!(updated.updated_by, Some(editor));
  assert!(updated.updated_at.is_some());
  assert_eq!(updated.title, "Pour slab");

  let cleared = TaskPatch { remarks: Some(None), ..Default::default() };
  let updated = s.update_task(task.id, cleared, Some(editor)).await.unwrap().unwrap();
  assert_eq!(updated.remarks, None);
  assert_eq!(updated.status, TaskStatus::Completed);
}

#[tokio::test]
async fn verify_and_unverify() {
  let s = store().await;
  let task = s
    .insert_tasks(vec![NewDailyTask::new("Pour slab", day(2), None)])
    .await
    .unwrap()
    .remove(0);
  let admin = Uuid::new_v4();

  let verified = s
    .update_task(task.id, TaskPatch::verification(true, Some(admin), Utc::now()), Some(admin))
    .await
    .unwrap()
    .unwrap();
  assert!(verified.verified);
  assert_eq!(verified.verified_by, Some(admin));
  assert!(verified.verified_at.is_some());

  let unverified = s
    .update_task(task.id, TaskPatch::verification(false, Some(admin), Utc::now()), Some(admin))
    .await
    .unwrap()
    .unwrap();
  assert!(!unverified.verified);
  assert_eq!(unverified.verified_by, None);
  assert_eq!(unverified.verified_at, None);
}

#[tokio::test]
async fn update_or_delete_missing_task() {
  let s = store().await;
  let patch = TaskPatch { title: Some("x".into()), ..Default::default() };
  assert!(s.update_task(Uuid::new_v4(), patch, None).await.unwrap().is_none());
  assert!(!s.delete_task(Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn carry_over_is_idempotent() {
  let s = store().await;
  let owner = Some(Uuid::new_v4());
  let yesterday = s
    .insert_tasks(vec![
      NewDailyTask::new("Install formwork", day(9), owner),
      NewDailyTask::new("Clean site", day(9), owner),
    ])
    .await
    .unwrap();
  let done = TaskPatch { status: Some(TaskStatus::Completed), ..Default::default() };
  s.update_task(yesterday[1].id, done, owner).await.unwrap();

  let inserted = ensure_carry_over(&s, day(10), day(10)).await.unwrap();
  assert_eq!(inserted.len(), 1);

  let today = s.tasks_on(day(10)).await.unwrap();
  assert_eq!(today.len(), 1);
  assert_eq!(today[0].title, "Install formwork");
  assert_eq!(today[0].carry_over_from, Some(yesterday[0].id));
  assert_eq!(today[0].user_id, owner);
  assert_eq!(today[0].updated_by, None);
  assert!(!today[0].verified);

  assert!(ensure_carry_over(&s, day(10), day(10)).await.unwrap().is_empty());
  assert_eq!(s.tasks_on(day(10)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn carry_over_only_for_today() {
  let s = store().await;
  s.insert_tasks(vec![NewDailyTask::new("Install formwork", day(8), None)])
    .await
    .unwrap();

  assert!(ensure_carry_over(&s, day(9), day(10)).await.unwrap().is_empty());
  assert!(s.tasks_on(day(9)).await.unwrap().is_empty());
}

#[tokio::test]
async fn carried_chain_points_at_root() {
  let s = store().await;
  let root = s
    .insert_tasks(vec![NewDailyTask::new("Waterproofing", day(7), None)])
    .await
    .unwrap()
    .remove(0);

  ensure_carry_over(&s, day(8), day(8)).await.unwrap();
  ensure_carry_over(&s, day(10), day(10)).await.unwrap();

  let latest = s.tasks_on(day(10)).await.unwrap();
  assert_eq!(latest.len(), 1);
  assert_eq!(latest[0].carry_over_from, Some(root.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_carry_over_copies_once() {
  let s = Arc::new(store().await);
  s.insert_tasks(vec![NewDailyTask::new("Install formwork", day(9), None)])
    .await
    .unwrap();

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let s = Arc::clone(&s);
      tokio::spawn(async move { ensure_carry_over(s.as_ref(), day(10), day(10)).await })
    })
    .collect();

  let mut inserted = 0;
  for handle in handles {
    inserted += handle.await.unwrap().unwrap().len();
  }
  assert_eq!(inserted, 1);
  assert_eq!(s.tasks_on(day(10)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_root_on_one_day_is_rejected() {
  let s = store().await;
  let root = Some(Uuid::new_v4());
  let copy = |title: &str| NewDailyTask {
    carry_over_from: root,
    ..NewDailyTask::new(title, day(10), None)
  };

  s.insert_tasks(vec![copy("Install formwork")]).await.unwrap();
  assert!(s.insert_tasks(vec![copy("Install formwork again")]).await.is_err());
  assert_eq!(s.tasks_on(day(10)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn tasks_carry_editor_name() {
  let s = store().await;
  let named = s
    .create_account("lead@site.test".into(), "hash".into(), Role::Supervisor, Some("Wei Ling".into()))
    .await
    .unwrap()
    .unwrap();
  let unnamed = s
    .create_account("crew@site.test".into(), "hash".into(), Role::Supervisor, None)
    .await
    .unwrap()
    .unwrap();

  let created = s
    .insert_tasks(vec![NewDailyTask::new("Rebar check", day(3), Some(named.id))])
    .await
    .unwrap()
    .remove(0);
  assert_eq!(created.updated_by_name.as_deref(), Some("Wei Ling"));

  let patch = TaskPatch { status: Some(TaskStatus::Completed), ..Default::default() };
  let updated = s.update_task(created.id, patch, Some(unnamed.id)).await.unwrap().unwrap();
  assert_eq!(updated.updated_by_name.as_deref(), Some("crew@site.test"));
  assert!(updated.updated_at.is_some());

  let listed = s.tasks_on(day(3)).await.unwrap();
  assert_eq!(listed[0].updated_by_name.as_deref(), Some("crew@site.test"));

  let anonymous = s
    .insert_tasks(vec![NewDailyTask::new("Sweep deck", day(3), None)])
    .await
    .unwrap();
  assert_eq!(anonymous[0].updated_by_name, None);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_refused() {
  let s = store().await;
  let p = s
    .create_account("site@example.com".into(), "hash".into(), Role::Supervisor, None)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(p.role, Role::Supervisor);

  let again = s
    .create_account("SITE@example.com".into(), "hash".into(), Role::Admin, None)
    .await
    .unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn credentials_and_profile_update() {
  let s = store().await;
  let p = s
    .create_account("pm@example.com".into(), "phc".into(), Role::Admin, Some("Lee".into()))
    .await
    .unwrap()
    .unwrap();

  let creds = s.credentials("pm@example.com".into()).await.unwrap().unwrap();
  assert_eq!(creds.password_hash, "phc");
  assert_eq!(creds.profile, p);
  assert!(s.credentials("nobody@example.com".into()).await.unwrap().is_none());

  let update = ProfileUpdate { full_name: None, ic_last4: Some("0421".into()) };
  let updated = s.update_profile(p.id, update).await.unwrap().unwrap();
  assert_eq!(updated.ic_last4.as_deref(), Some("0421"));
  assert_eq!(updated.full_name.as_deref(), Some("Lee"));

  let bad = ProfileUpdate { full_name: None, ic_last4: Some("12".into()) };
  assert!(s.update_profile(p.id, bad).await.is_err());
}

#[tokio::test]
async fn sessions_resolve_until_expiry_or_revocation() {
  let s = store().await;
  let p = s
    .create_account("a@example.com".into(), "h".into(), Role::Supervisor, None)
    .await
    .unwrap()
    .unwrap();
  let now = Utc::now();

  s.create_session("live".into(), p.id, now + chrono::Duration::hours(1))
    .await
    .unwrap();
  s.create_session("stale".into(), p.id, now - chrono::Duration::hours(1))
    .await
    .unwrap();

  assert_eq!(s.resolve_session("live".into(), now).await.unwrap(), Some(p.clone()));
  assert_eq!(s.resolve_session("stale".into(), now).await.unwrap(), None);
  assert_eq!(s.resolve_session("unknown".into(), now).await.unwrap(), None);

  assert!(s.revoke_session("live".into()).await.unwrap());
  assert!(!s.revoke_session("live".into()).await.unwrap());
  assert_eq!(s.resolve_session("live".into(), now).await.unwrap(), None);
}
