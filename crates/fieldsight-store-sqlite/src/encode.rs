//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC with microsecond precision so that string
//! order matches time order. Calendar dates are `YYYY-MM-DD`. UUIDs are
//! hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use fieldsight_core::{
  profile::{Profile, Role},
  record::{Record, Row},
  table::Table,
  task::{DailyTask, TaskStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(column: &'static str, s: String) -> Result<T> {
  T::from_str(&s).map_err(|_| Error::Corrupt { column, value: s })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `log_records` row.
pub struct RawRecord {
  pub id:          String,
  pub table_name:  String,
  pub created_at:  String,
  pub user_id:     Option<String>,
  pub fields_json: String,
}

impl RawRecord {
  pub const COLUMNS: &'static str = "id, table_name, created_at, user_id, fields_json";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      table_name:  row.get(1)?,
      created_at:  row.get(2)?,
      user_id:     row.get(3)?,
      fields_json: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    let fields: Row = serde_json::from_str(&self.fields_json)?;
    Ok(Record {
      id: decode_uuid(&self.id)?,
      table: decode_enum::<Table>("table_name", self.table_name)?,
      created_at: decode_dt(&self.created_at)?,
      user_id: decode_opt_uuid(self.user_id)?,
      fields,
    })
  }
}

/// Raw strings read directly from a `daily_tasks` row.
pub struct RawTask {
  pub id:              String,
  pub title:           String,
  pub task_date:       String,
  pub status:          String,
  pub verified:        bool,
  pub verified_by:     Option<String>,
  pub verified_at:     Option<String>,
  pub remarks:         Option<String>,
  pub carry_over_from: Option<String>,
  pub user_id:         Option<String>,
  pub updated_by:      Option<String>,
  pub updated_at:      Option<String>,
  pub created_at:      String,
  pub updated_by_name: Option<String>,
}

impl RawTask {
  /// Task columns plus the editor's display name (full name, else email).
  /// Append `WHERE` / `ORDER BY` clauses against the `t` alias.
  pub const SELECT: &'static str = "SELECT t.id, t.title, t.task_date, t.status, t.verified, \
     t.verified_by, t.verified_at, t.remarks, t.carry_over_from, t.user_id, t.updated_by, \
     t.updated_at, t.created_at, COALESCE(NULLIF(TRIM(p.full_name), ''), p.email) \
     FROM daily_tasks t LEFT JOIN profiles p ON p.id = t.updated_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      title:           row.get(1)?,
      task_date:       row.get(2)?,
      status:          row.get(3)?,
      verified:        row.get(4)?,
      verified_by:     row.get(5)?,
      verified_at:     row.get(6)?,
      remarks:         row.get(7)?,
      carry_over_from: row.get(8)?,
      user_id:         row.get(9)?,
      updated_by:      row.get(10)?,
      updated_at:      row.get(11)?,
      created_at:      row.get(12)?,
      updated_by_name: row.get(13)?,
    })
  }

  pub fn into_task(self) -> Result<DailyTask> {
    Ok(DailyTask {
      id:              decode_uuid(&self.id)?,
      title:           self.title,
      task_date:       decode_date(&self.task_date)?,
      status:          decode_enum::<TaskStatus>("status", self.status)?,
      verified:        self.verified,
      verified_by:     decode_opt_uuid(self.verified_by)?,
      verified_at:     decode_opt_dt(self.verified_at)?,
      remarks:         self.remarks,
      carry_over_from: decode_opt_uuid(self.carry_over_from)?,
      user_id:         decode_opt_uuid(self.user_id)?,
      updated_by:      decode_opt_uuid(self.updated_by)?,
      updated_by_name: self.updated_by_name,
      updated_at:      decode_opt_dt(self.updated_at)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `profiles` row, password hash excluded.
pub struct RawProfile {
  pub id:        String,
  pub email:     String,
  pub role:      String,
  pub full_name: Option<String>,
  pub ic_last4:  Option<String>,
}

impl RawProfile {
  pub const COLUMNS: &'static str = "id, email, role, full_name, ic_last4";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      email:     row.get(1)?,
      role:      row.get(2)?,
      full_name: row.get(3)?,
      ic_last4:  row.get(4)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      id:        decode_uuid(&self.id)?,
      email:     self.email,
      role:      decode_enum::<Role>("role", self.role)?,
      full_name: self.full_name,
      ic_last4:  self.ic_last4,
    })
  }
}
