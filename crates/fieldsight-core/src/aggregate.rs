//! Chart aggregates derived from table rows.
//!
//! Every function here is a pure fold over rows. Numeric fields are read the
//! way a form would have typed them: a leading number is taken, anything
//! else counts as zero. No output value is ever NaN.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Row;

/// Label used when a status field is empty.
pub const UNKNOWN_STATUS: &str = "Unknown";
/// Label used by report-style breakdowns when a status field is empty.
pub const UNSPECIFIED_STATUS: &str = "unspecified";

/// Material statuses that count as an active order.
const ACTIVE_MATERIAL_STATUSES: &[&str] = &["pending", "approved", "ordered"];

// ─── Output rows ─────────────────────────────────────────────────────────────

/// One point of a date series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTotal {
  pub date:  String,
  pub value: f64,
}

/// One slice of a status breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
  pub name:  String,
  pub value: usize,
}

// ─── Field readers ───────────────────────────────────────────────────────────

/// Read a field as a number: JSON numbers as-is, strings by their leading
/// numeric prefix, everything else (and non-finite results) as zero.
pub fn lenient_number(value: Option<&Value>) -> f64 {
  let n = match value {
    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
    Some(Value::String(s)) => leading_float(s),
    _ => 0.0,
  };
  if n.is_finite() { n } else { 0.0 }
}

fn leading_float(s: &str) -> f64 {
  let s = s.trim_start();
  let bytes = s.as_bytes();
  let digits = |mut i: usize| {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
      i += 1;
    }
    i
  };

  let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
  let int_end = digits(end);
  let mut mantissa_digits = int_end - end;
  end = int_end;

  if bytes.get(end) == Some(&b'.') {
    let frac_end = digits(end + 1);
    mantissa_digits += frac_end - end - 1;
    if mantissa_digits > 0 {
      end = frac_end;
    }
  }
  if mantissa_digits == 0 {
    return 0.0;
  }

  if matches!(bytes.get(end), Some(b'e' | b'E')) {
    let mut exp = end + 1;
    if matches!(bytes.get(exp), Some(b'+' | b'-')) {
      exp += 1;
    }
    let exp_end = digits(exp);
    if exp_end > exp {
      end = exp_end;
    }
  }

  s[..end].parse().unwrap_or(0.0)
}

/// Read a field as display text; null and missing are empty.
fn text(row: &Row, field: &str) -> String {
  match row.get(field) {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}

// ─── Folds ───────────────────────────────────────────────────────────────────

/// Sum `value_field` per distinct `date_field` value.
///
/// Dates are compared as raw strings, so differently formatted spellings of
/// one day stay separate. Output is sorted ascending by that string.
pub fn sum_by_date<'a>(
  rows: impl IntoIterator<Item = &'a Row>,
  date_field: &str,
  value_field: &str,
) -> Vec<DateTotal> {
  let mut buckets: BTreeMap<String, f64> = BTreeMap::new();
  for row in rows {
    *buckets.entry(text(row, date_field)).or_default() +=
      lenient_number(row.get(value_field));
  }
  buckets
    .into_iter()
    .map(|(date, value)| DateTotal { date, value })
    .collect()
}

/// Count rows per distinct `status_field` value, in order of first
/// appearance. Empty statuses are counted under `fallback`.
pub fn count_by_status<'a>(
  rows: impl IntoIterator<Item = &'a Row>,
  status_field: &str,
  fallback: &str,
) -> Vec<StatusCount> {
  let mut out: Vec<StatusCount> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();
  for row in rows {
    let mut name = text(row, status_field);
    if name.is_empty() {
      name = fallback.to_owned();
    }
    match index.get(&name) {
      Some(&i) => out[i].value += 1,
      None => {
        index.insert(name.clone(), out.len());
        out.push(StatusCount { name, value: 1 });
      }
    }
  }
  out
}

/// Count rows whose status is not `closed_value`, ignoring case.
pub fn count_open<'a>(
  rows: impl IntoIterator<Item = &'a Row>,
  status_field: &str,
  closed_value: &str,
) -> usize {
  rows
    .into_iter()
    .filter(|row| !text(row, status_field).eq_ignore_ascii_case(closed_value))
    .count()
}

/// Total of one numeric field.
pub fn sum_field<'a>(rows: impl IntoIterator<Item = &'a Row>, field: &str) -> f64 {
  rows.into_iter().map(|row| lenient_number(row.get(field))).sum()
}

/// Parse a stored date, accepting `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_day(s: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(s.trim()).ok().map(|dt| dt.date_naive()))
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// The headline numbers and chart series shown on the dashboard and the
/// public landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
  pub total_concrete_m3:       f64,
  pub total_workers:           f64,
  pub open_issues:             usize,
  pub active_material_orders:  usize,
  pub upcoming_bbs_deliveries: usize,
  pub upcoming_bbs_tons:       f64,
  pub concrete_by_date:        Vec<DateTotal>,
  pub manpower_by_date:        Vec<DateTotal>,
  pub bbs_by_date:             Vec<DateTotal>,
  pub materials_by_status:     Vec<StatusCount>,
  pub issues_by_severity:      Vec<StatusCount>,
}

/// Rows of every table, as input to [`DashboardSummary::build`].
#[derive(Debug, Clone, Copy)]
pub struct DashboardInput<'a> {
  pub concrete:  &'a [Row],
  pub manpower:  &'a [Row],
  pub issues:    &'a [Row],
  pub materials: &'a [Row],
  pub bbs:       &'a [Row],
}

impl DashboardSummary {
  pub fn build(input: DashboardInput<'_>, today: NaiveDate) -> Self {
    let active_material_orders = input
      .materials
      .iter()
      .filter(|row| {
        let status = text(row, "status").to_lowercase();
        ACTIVE_MATERIAL_STATUSES.contains(&status.as_str())
      })
      .count();

    let upcoming: Vec<&Row> = input
      .bbs
      .iter()
      .filter(|row| parse_day(&text(row, "delivery_date")).is_some_and(|d| d >= today))
      .collect();

    Self {
      total_concrete_m3: sum_field(input.concrete, "volume"),
      total_workers: sum_field(input.manpower, "workers"),
      open_issues: count_open(input.issues, "status", "closed"),
      active_material_orders,
      upcoming_bbs_deliveries: upcoming.len(),
      upcoming_bbs_tons: sum_field(upcoming.iter().copied(), "weight_tons"),
      concrete_by_date: sum_by_date(input.concrete, "date", "volume"),
      manpower_by_date: sum_by_date(input.manpower, "date", "workers"),
      bbs_by_date: sum_by_date(input.bbs, "delivery_date", "weight_tons"),
      materials_by_status: count_by_status(input.materials, "status", UNKNOWN_STATUS),
      issues_by_severity: count_by_status(input.issues, "severity", UNKNOWN_STATUS),
    }
  }
}

/// One-line text rendering of a series: the first five points, then a note
/// if more exist. Labels are printed as they are, blank ones included.
pub fn summarize_series(series: &[DateTotal], unit: &str) -> String {
  if series.is_empty() {
    return "No data available.".to_owned();
  }
  let parts: Vec<String> = series
    .iter()
    .take(5)
    .map(|p| {
      let label = &p.date;
      if unit.is_empty() {
        format!("{label}: {}", p.value)
      } else {
        format!("{label}: {} {unit}", p.value)
      }
    })
    .collect();
  let more = if series.len() > 5 { "; additional data available" } else { "" };
  format!("{}{more}", parts.join("; "))
}

/// One-line text rendering of a status breakdown.
pub fn summarize_breakdown(counts: &[StatusCount]) -> String {
  if counts.is_empty() {
    return "No data available.".to_owned();
  }
  counts
    .iter()
    .map(|c| format!("{}: {}", c.name, c.value))
    .collect::<Vec<_>>()
    .join("; ")
}
