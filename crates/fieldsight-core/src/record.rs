//! Stored log records and the flat row shape they travel in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  entry::{BbsDelivery, ConcreteEntry, Entry, IssueEntry, ManpowerEntry, MaterialEntry},
  table::Table,
};

/// A flat key-value row, as consumed by the CSV codec and the aggregations.
pub type Row = serde_json::Map<String, Value>;

/// A persisted log record.
///
/// `id`, `created_at` and `user_id` are assigned by the store; `fields` holds
/// everything the caller supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  pub id:         Uuid,
  pub table:      Table,
  /// Server-assigned timestamp; never changes after creation.
  pub created_at: DateTime<Utc>,
  /// The profile that created the record. Does not restrict visibility.
  pub user_id:    Option<Uuid>,
  #[serde(flatten)]
  pub fields:     Row,
}

impl Record {
  /// The record as a single flat row, provenance columns included.
  pub fn to_row(&self) -> Row {
    let mut row = self.fields.clone();
    row.insert("id".into(), Value::String(self.id.to_string()));
    row.insert("created_at".into(), Value::String(self.created_at.to_rfc3339()));
    row.insert(
      "user_id".into(),
      self.user_id.map_or(Value::Null, |id| Value::String(id.to_string())),
    );
    row
  }
}

/// Input to [`crate::store::RecordStore::insert`].
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub table:   Table,
  pub user_id: Option<Uuid>,
  pub fields:  Row,
}

impl NewRecord {
  /// Validate `fields` against the table's entry type and build the insert.
  ///
  /// Unknown keys (including any caller-supplied `id`, `created_at` or
  /// `user_id`) are dropped and null values are omitted.
  pub fn validated(table: Table, user_id: Option<Uuid>, fields: Row) -> Result<Self> {
    let fields = match table {
      Table::Concrete => normalize::<ConcreteEntry>(fields)?,
      Table::Manpower => normalize::<ManpowerEntry>(fields)?,
      Table::Issues => normalize::<IssueEntry>(fields)?,
      Table::Materials => normalize::<MaterialEntry>(fields)?,
      Table::BbsSchedule => normalize::<BbsDelivery>(fields)?,
    };
    Ok(Self { table, user_id, fields })
  }

  /// Build an insert from a typed entry.
  pub fn from_entry<E: Entry>(user_id: Option<Uuid>, entry: &E) -> Result<Self> {
    entry.validate()?;
    Ok(Self { table: E::TABLE, user_id, fields: entry_to_row(entry)? })
  }
}

fn normalize<E: Entry>(fields: Row) -> Result<Row> {
  let entry: E = serde_json::from_value(Value::Object(fields)).map_err(|e| {
    Error::InvalidField { field: E::TABLE.into(), reason: e.to_string() }
  })?;
  entry.validate()?;
  entry_to_row(&entry)
}

fn entry_to_row<E: Entry>(entry: &E) -> Result<Row> {
  match serde_json::to_value(entry)? {
    Value::Object(mut map) => {
      map.retain(|_, v| !v.is_null());
      Ok(map)
    }
    other => Err(Error::InvalidField {
      field:  E::TABLE.into(),
      reason: format!("expected an object, got {other}"),
    }),
  }
}
