//! CSV export codec for FieldSight.
//!
//! Renders flat rows as CSV text with a header line. Pure synchronous; no
//! HTTP or database dependencies. Encoding cannot fail, so there is no error
//! type.
//!
//! # Quick start
//!
//! ```no_run
//! use fieldsight_core::record::Row;
//! use serde_json::json;
//!
//! let row: Row = serde_json::from_value(json!({"a": "1,2", "b": 3})).unwrap();
//! assert_eq!(fieldsight_csv::encode(&[row], &["a", "b"]), "a,b\n\"1,2\",3");
//! ```

mod encode;

use chrono::NaiveDate;
use fieldsight_core::{
  record::{Record, Row},
  table::Table,
};

/// MIME type of an export download.
pub const CONTENT_TYPE: &str = "text/csv;charset=utf-8";

/// Encode `rows` under a header of `columns`.
///
/// Columns appear in the order given; keys not listed are left out and
/// missing or null values render empty. Lines are separated by `\n` with no
/// trailing newline. No rows means no output at all, not even a header.
pub fn encode(rows: &[Row], columns: &[&str]) -> String {
  if rows.is_empty() {
    return String::new();
  }

  let mut out = String::new();
  encode::push_line(&mut out, columns.iter().copied());
  for row in rows {
    let cells: Vec<String> = columns
      .iter()
      .map(|c| encode::render_value(row.get(*c)))
      .collect();
    encode::push_line(&mut out, cells.iter().map(String::as_str));
  }
  out
}

/// Encode stored records, with `id`, `created_at` and `user_id` available as
/// columns.
pub fn encode_records(records: &[Record], columns: &[&str]) -> String {
  let rows: Vec<Row> = records.iter().map(Record::to_row).collect();
  encode(&rows, columns)
}

/// `{table}_{YYYY-MM-DD}.csv`
pub fn download_file_name(table: Table, date: NaiveDate) -> String {
  format!("{table}_{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use serde_json::{Value, json};
  use uuid::Uuid;

  use super::*;

  fn row(v: Value) -> Row {
    match v {
      Value::Object(m) => m,
      _ => unreachable!(),
    }
  }

  /// Minimal RFC 4180 reader for checking output: quoted fields may hold
  /// commas, doubled quotes and newlines.
  fn decode(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut chars = text.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
      match (quoted, c) {
        (true, '"') if chars.peek() == Some(&'"') => {
          chars.next();
          field.push('"');
        }
        (true, '"') => quoted = false,
        (true, c) => field.push(c),
        (false, '"') => quoted = true,
        (false, ',') => record.push(std::mem::take(&mut field)),
        (false, '\n') => {
          record.push(std::mem::take(&mut field));
          records.push(std::mem::take(&mut record));
        }
        (false, c) => field.push(c),
      }
    }
    record.push(field);
    records.push(record);
    records
  }

  #[test]
  fn empty_input_is_empty_output() {
    assert_eq!(encode(&[], &["date", "volume"]), "");
    assert_eq!(encode_records(&[], Table::Concrete.export_columns()), "");
  }

  #[test]
  fn header_then_one_line_per_row() {
    let rows = vec![
      row(json!({"date": "2024-01-01", "volume": 5})),
      row(json!({"date": "2024-01-02", "volume": "7.5"})),
      row(json!({"date": "2024-01-03"})),
    ];
    let out = encode(&rows, &["date", "volume"]);
    assert_eq!(out, "date,volume\n2024-01-01,5\n2024-01-02,7.5\n2024-01-03,");
    assert_eq!(out.lines().count(), rows.len() + 1);
    assert!(!out.contains('\r'));
    assert!(!out.ends_with('\n'));
  }

  #[test]
  fn tricky_fields_survive_a_reader() {
    let rows = vec![
      row(json!({"a": "1,2", "b": "He said \"hi\"", "c": "line one\nline two"})),
      row(json!({"a": null, "b": false, "c": ["x", 1]})),
    ];
    let out = encode(&rows, &["a", "b", "c"]);
    assert!(out.contains("\"1,2\""));
    assert!(out.contains("\"He said \"\"hi\"\"\""));

    let decoded = decode(&out);
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[0], ["a", "b", "c"]);
    assert_eq!(decoded[1], ["1,2", "He said \"hi\"", "line one\nline two"]);
    assert_eq!(decoded[2], ["", "false", "[\"x\",1]"]);
  }

  #[test]
  fn unlisted_keys_are_omitted() {
    let rows = vec![row(json!({"keep": "yes", "drop": "no"}))];
    assert_eq!(encode(&rows, &["keep"]), "keep\nyes");
  }

  #[test]
  fn records_expose_provenance_columns() {
    let user = Uuid::new_v4();
    let record = Record {
      id:         Uuid::new_v4(),
      table:      Table::Concrete,
      created_at: Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap(),
      user_id:    Some(user),
      fields:     row(json!({"date": "2024-05-02", "location": "Core A", "volume": 8})),
    };
    let out = encode_records(&[record], &["date", "volume", "user_id", "created_at"]);
    let decoded = decode(&out);
    assert_eq!(decoded[1][0], "2024-05-02");
    assert_eq!(decoded[1][1], "8");
    assert_eq!(decoded[1][2], user.to_string());
    assert_eq!(decoded[1][3], "2024-05-02T08:30:00+00:00");
  }

  #[test]
  fn file_name() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    assert_eq!(download_file_name(Table::BbsSchedule, date), "bbs_schedule_2024-03-07.csv");
  }
}
