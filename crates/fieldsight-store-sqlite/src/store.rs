//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::NaiveDate;
use fieldsight_core::{
  carry_over::plan_carry_over,
  record::{NewRecord, Record},
  store::{CLEAR_ALL_SENTINEL, ChangeEvent, ChangeKind, RecordStore, Topic},
  table::Table,
  task::{DailyTask, NewDailyTask, TaskPatch},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value as SqlValue};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawRecord, RawTask, decode_date, encode_date, encode_dt, encode_uuid, now},
  schema::SCHEMA,
};

/// Buffered change notifications per subscriber before it is reported as
/// lagged.
const CHANGE_FEED_CAPACITY: usize = 256;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A FieldSight store backed by a single SQLite file.
///
/// Cloning is cheap: the connection and the change feed are both shared.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  events:          broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (events, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
    let store = Self { conn, events };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn publish(&self, topic: Topic, kind: ChangeKind, id: Option<Uuid>, task_date: Option<NaiveDate>) {
    tracing::debug!(%topic, ?kind, ?id, "store write");
    // No receivers is not an error.
    let _ = self.events.send(ChangeEvent { topic, kind, id, task_date });
  }

  async fn get_task(&self, id: Uuid) -> Result<Option<DailyTask>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawTask> = self
      .conn
      .call(move |conn| {
        let sql = format!("{} WHERE t.id = ?1", RawTask::SELECT);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawTask::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTask::into_task).transpose()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  // ── Log tables ────────────────────────────────────────────────────────────

  async fn list(&self, table: Table) -> Result<Vec<Record>> {
    let table_str: &'static str = table.into();

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM log_records WHERE table_name = ?1
           ORDER BY created_at DESC, rowid DESC",
          RawRecord::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![table_str], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn insert(&self, input: NewRecord) -> Result<Record> {
    let record = Record {
      id:         Uuid::new_v4(),
      table:      input.table,
      created_at: now(),
      user_id:    input.user_id,
      fields:     input.fields,
    };

    let id_str: String = encode_uuid(record.id);
    let table_str: &'static str = record.table.into();
    let at_str = encode_dt(record.created_at);
    let user_str = record.user_id.map(encode_uuid);
    let fields_str = serde_json::to_string(&record.fields)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO log_records (id, table_name, created_at, user_id, fields_json)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, table_str, at_str, user_str, fields_str],
        )?;
        Ok(())
      })
      .await?;

    self.publish(Topic::Log(record.table), ChangeKind::Insert, Some(record.id), None);
    Ok(record)
  }

  async fn delete(&self, table: Table, id: Uuid) -> Result<bool> {
    let table_str: &'static str = table.into();
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM log_records WHERE table_name = ?1 AND id = ?2",
          rusqlite::params![table_str, id_str],
        )?)
      })
      .await?;

    if removed > 0 {
      self.publish(Topic::Log(table), ChangeKind::Delete, Some(id), None);
    }
    Ok(removed > 0)
  }

  async fn clear_all(&self, table: Table) -> Result<u64> {
    let table_str: &'static str = table.into();
    let sentinel = encode_uuid(CLEAR_ALL_SENTINEL);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM log_records WHERE table_name = ?1 AND id != ?2",
          rusqlite::params![table_str, sentinel],
        )?)
      })
      .await?;

    tracing::info!(%table, removed, "table cleared");
    self.publish(Topic::Log(table), ChangeKind::Delete, None, None);
    Ok(removed as u64)
  }

  // ── Daily tasks ───────────────────────────────────────────────────────────

  async fn tasks_on(&self, date: NaiveDate) -> Result<Vec<DailyTask>> {
    let date_str = encode_date(date);
    let raws = self
      .conn
      .call(move |conn| Ok(select_tasks_on(conn, &date_str)?))
      .await?;
    raws.into_iter().map(RawTask::into_task).collect()
  }

  async fn latest_task_date(&self, before: Option<NaiveDate>) -> Result<Option<NaiveDate>> {
    let before_str = before.map(encode_date);

    let latest: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MAX(task_date) FROM daily_tasks
           WHERE ?1 IS NULL OR task_date < ?1",
          rusqlite::params![before_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    latest.as_deref().map(decode_date).transpose()
  }

  async fn insert_tasks(&self, tasks: Vec<NewDailyTask>) -> Result<Vec<DailyTask>> {
    if tasks.is_empty() {
      return Ok(Vec::new());
    }

    let mut inserted = fresh_tasks(tasks);
    let rows: Vec<([SqlValue; 8], Option<String>)> = inserted
      .iter()
      .map(|t| (task_row(t), t.updated_by.map(encode_uuid)))
      .collect();

    let names: Vec<Option<String>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut names = Vec::with_capacity(rows.len());
        {
          let mut stmt = tx.prepare(INSERT_TASK)?;
          for (row, editor) in &rows {
            stmt.execute(rusqlite::params_from_iter(row.iter()))?;
            names.push(match editor {
              Some(id) => display_name(&tx, id)?,
              None => None,
            });
          }
        }
        tx.commit()?;
        Ok(names)
      })
      .await?;

    for (task, name) in inserted.iter_mut().zip(names) {
      task.updated_by_name = name;
      self.publish(Topic::DailyTasks, ChangeKind::Insert, Some(task.id), Some(task.task_date));
    }
    Ok(inserted)
  }

  async fn carry_over(&self, today: NaiveDate) -> Result<Vec<DailyTask>> {
    let today_str = encode_date(today);

    let inserted: Vec<DailyTask> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous_date: Option<String> = tx.query_row(
          "SELECT MAX(task_date) FROM daily_tasks WHERE task_date < ?1",
          rusqlite::params![today_str],
          |r| r.get(0),
        )?;
        let Some(previous_date) = previous_date else {
          return Ok(Vec::new());
        };

        let previous = decode_tasks(select_tasks_on(&tx, &previous_date)?)?;
        let already_today = decode_tasks(select_tasks_on(&tx, &today_str)?)?;
        let plan = plan_carry_over(&previous, &already_today, today);

        let mut inserted = Vec::with_capacity(plan.len());
        {
          let mut stmt = tx.prepare(&format!("{INSERT_TASK} ON CONFLICT DO NOTHING"))?;
          for mut task in fresh_tasks(plan) {
            if stmt.execute(rusqlite::params_from_iter(task_row(&task)))? == 1 {
              task.updated_by_name = match task.updated_by {
                Some(id) => display_name(&tx, &encode_uuid(id))?,
                None => None,
              };
              inserted.push(task);
            }
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    for task in &inserted {
      self.publish(Topic::DailyTasks, ChangeKind::Insert, Some(task.id), Some(task.task_date));
    }
    Ok(inserted)
  }

  async fn update_task(
    &self,
    id: Uuid,
    patch: TaskPatch,
    updated_by: Option<Uuid>,
  ) -> Result<Option<DailyTask>> {
    let mut sets: Vec<&'static str> = vec!["updated_at = ?", "updated_by = ?"];
    let mut params: Vec<SqlValue> = vec![
      SqlValue::Text(encode_dt(now())),
      opt_text(updated_by.map(encode_uuid)),
    ];

    if let Some(title) = patch.title {
      sets.push("title = ?");
      params.push(SqlValue::Text(title));
    }
    if let Some(status) = patch.status {
      sets.push("status = ?");
      params.push(SqlValue::Text(status.to_string()));
    }
    if let Some(remarks) = patch.remarks {
      sets.push("remarks = ?");
      params.push(opt_text(remarks));
    }
    if let Some(verified) = patch.verified {
      sets.push("verified = ?");
      params.push(SqlValue::Integer(i64::from(verified)));
    }
    if let Some(by) = patch.verified_by {
      sets.push("verified_by = ?");
      params.push(opt_text(by.map(encode_uuid)));
    }
    if let Some(at) = patch.verified_at {
      sets.push("verified_at = ?");
      params.push(opt_text(at.map(encode_dt)));
    }
    params.push(SqlValue::Text(encode_uuid(id)));

    let sql = format!("UPDATE daily_tasks SET {} WHERE id = ?", sets.join(", "));
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?))
      .await?;

    if changed == 0 {
      return Ok(None);
    }

    let task = self.get_task(id).await?;
    if let Some(task) = &task {
      self.publish(Topic::DailyTasks, ChangeKind::Update, Some(id), Some(task.task_date));
    }
    Ok(task)
  }

  async fn delete_task(&self, id: Uuid) -> Result<bool> {
    let Some(task) = self.get_task(id).await? else {
      return Ok(false);
    };
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM daily_tasks WHERE id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    if removed > 0 {
      self.publish(Topic::DailyTasks, ChangeKind::Delete, Some(id), Some(task.task_date));
    }
    Ok(removed > 0)
  }

  // ── Change feed ───────────────────────────────────────────────────────────

  fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> { self.events.subscribe() }
}

fn opt_text(s: Option<String>) -> SqlValue { s.map_or(SqlValue::Null, SqlValue::Text) }

// ─── Task helpers ────────────────────────────────────────────────────────────

const INSERT_TASK: &str = "INSERT INTO daily_tasks (
    id, title, task_date, status, carry_over_from, user_id, updated_by, created_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// Assign ids and a shared creation time; new tasks start unverified and
/// without remarks.
fn fresh_tasks(tasks: Vec<NewDailyTask>) -> Vec<DailyTask> {
  let created_at = now();
  tasks
    .into_iter()
    .map(|t| DailyTask {
      id: Uuid::new_v4(),
      title: t.title,
      task_date: t.task_date,
      status: t.status,
      verified: false,
      verified_by: None,
      verified_at: None,
      remarks: None,
      carry_over_from: t.carry_over_from,
      user_id: t.user_id,
      updated_by: t.updated_by,
      updated_by_name: None,
      updated_at: None,
      created_at,
    })
    .collect()
}

/// Parameters for [`INSERT_TASK`].
fn task_row(t: &DailyTask) -> [SqlValue; 8] {
  [
    SqlValue::Text(encode_uuid(t.id)),
    SqlValue::Text(t.title.clone()),
    SqlValue::Text(encode_date(t.task_date)),
    SqlValue::Text(t.status.to_string()),
    opt_text(t.carry_over_from.map(encode_uuid)),
    opt_text(t.user_id.map(encode_uuid)),
    opt_text(t.updated_by.map(encode_uuid)),
    SqlValue::Text(encode_dt(t.created_at)),
  ]
}

fn select_tasks_on(conn: &rusqlite::Connection, date: &str) -> rusqlite::Result<Vec<RawTask>> {
  let sql = format!(
    "{} WHERE t.task_date = ?1 ORDER BY t.created_at ASC, t.rowid ASC",
    RawTask::SELECT
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(rusqlite::params![date], RawTask::from_row)?
    .collect()
}

fn decode_tasks(raws: Vec<RawTask>) -> tokio_rusqlite::Result<Vec<DailyTask>> {
  raws
    .into_iter()
    .map(RawTask::into_task)
    .collect::<Result<_>>()
    .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))
}

/// Full name if set, otherwise the email; `None` for an unknown profile.
fn display_name(conn: &rusqlite::Connection, profile_id: &str) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT COALESCE(NULLIF(TRIM(full_name), ''), email) FROM profiles WHERE id = ?1",
      rusqlite::params![profile_id],
      |r| r.get(0),
    )
    .optional()
}
