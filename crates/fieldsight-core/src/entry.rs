//! Typed views of the site-log tables.
//!
//! Rows travel and persist as flat JSON maps (see [`crate::record::Row`]).
//! These structs define what a well-formed row of each table looks like and
//! are used to validate input before anything reaches the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum::{Display, EnumString};

use crate::{Error, Result, table::Table};

// ─── Entry trait ─────────────────────────────────────────────────────────────

/// A typed log entry bound to its table.
pub trait Entry: Serialize + DeserializeOwned {
  const TABLE: Table;

  /// Check required fields and field formats.
  fn validate(&self) -> Result<()>;
}

fn required(field: &'static str, value: &Option<String>) -> Result<()> {
  match value.as_deref().map(str::trim) {
    Some(v) if !v.is_empty() => Ok(()),
    _ => Err(Error::MissingField(field)),
  }
}

fn iso_date(field: &'static str, value: &Option<String>) -> Result<()> {
  match value.as_deref().map(str::trim) {
    None | Some("") => Ok(()),
    Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
      .map(|_| ())
      .map_err(|e| Error::InvalidField { field, reason: e.to_string() }),
  }
}

// ─── Lenient numbers ─────────────────────────────────────────────────────────

/// Form inputs arrive as either JSON numbers or numeric strings; an empty
/// string means "not filled in". The same holds for an unselected dropdown.
pub(crate) mod lenient {
  use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, Error as _, IntoDeserializer as _, value::StrDeserializer},
  };

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Num(f64),
    Text(String),
  }

  fn raw<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match Option::<Raw>::deserialize(d)? {
      None => Ok(None),
      Some(Raw::Num(n)) => Ok(Some(n)),
      Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
      Some(Raw::Text(s)) => s
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| D::Error::custom(format!("not a number: {s:?}"))),
    }
  }

  pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match raw(d)? {
      Some(n) if !n.is_finite() || n < 0.0 => {
        Err(D::Error::custom(format!("expected a non-negative number, got {n}")))
      }
      other => Ok(other),
    }
  }

  pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    match raw(d)? {
      None => Ok(None),
      Some(n) if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
        Ok(Some(n as u32))
      }
      Some(n) => Err(D::Error::custom(format!("expected a whole count, got {n}"))),
    }
  }

  /// One of a fixed set of labels, or `None` when blank.
  pub fn choice<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
  where
    D: Deserializer<'de>,
    T: DeserializeOwned,
  {
    match Option::<String>::deserialize(d)? {
      Some(s) if !s.trim().is_empty() => {
        let label: StrDeserializer<'_, D::Error> = s.trim().into_deserializer();
        T::deserialize(label).map(Some)
      }
      _ => Ok(None),
    }
  }
}

// ─── Concrete ────────────────────────────────────────────────────────────────

/// A concrete pour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcreteEntry {
  pub date:       Option<String>,
  pub pour_id:    Option<String>,
  pub location:   Option<String>,
  pub element:    Option<String>,
  /// Cubic metres.
  #[serde(deserialize_with = "lenient::decimal")]
  pub volume:     Option<f64>,
  pub mix:        Option<String>,
  pub supplier:   Option<String>,
  pub start_time: Option<String>,
  pub end_time:   Option<String>,
  /// Number of test cubes taken.
  #[serde(deserialize_with = "lenient::count")]
  pub cubes:      Option<u32>,
  pub supervisor: Option<String>,
  pub notes:      Option<String>,
}

impl Entry for ConcreteEntry {
  const TABLE: Table = Table::Concrete;

  fn validate(&self) -> Result<()> {
    required("date", &self.date)?;
    iso_date("date", &self.date)?;
    required("location", &self.location)?;
    self.volume.ok_or(Error::MissingField("volume"))?;
    Ok(())
  }
}

// ─── Manpower ────────────────────────────────────────────────────────────────

/// A headcount for one contractor and trade on one shift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManpowerEntry {
  pub date:       Option<String>,
  pub contractor: Option<String>,
  pub trade:      Option<String>,
  #[serde(deserialize_with = "lenient::count")]
  pub workers:    Option<u32>,
  pub shift:      Option<String>,
  #[serde(deserialize_with = "lenient::decimal")]
  pub hours:      Option<f64>,
  /// Formatted by [`crate::manpower::encode_zone`].
  pub zone:       Option<String>,
  pub supervisor: Option<String>,
  /// Formatted by [`crate::manpower::pack_notes`].
  pub notes:      Option<String>,
}

impl Entry for ManpowerEntry {
  const TABLE: Table = Table::Manpower;

  fn validate(&self) -> Result<()> {
    required("date", &self.date)?;
    iso_date("date", &self.date)?;
    required("contractor", &self.contractor)?;
    self.workers.ok_or(Error::MissingField("workers"))?;
    Ok(())
  }
}

// ─── Issues ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum IssueStatus {
  Open,
  #[serde(rename = "In Progress")]
  #[strum(serialize = "In Progress")]
  InProgress,
  Blocked,
  Closed,
}

/// A site issue raised for follow-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueEntry {
  pub date:        Option<String>,
  pub location:    Option<String>,
  pub description: Option<String>,
  #[serde(deserialize_with = "lenient::choice")]
  pub severity:    Option<Severity>,
  #[serde(deserialize_with = "lenient::choice")]
  pub status:      Option<IssueStatus>,
  pub raised_by:   Option<String>,
  pub owner:       Option<String>,
  pub due_by:      Option<String>,
  pub photo_url:   Option<String>,
}

impl Entry for IssueEntry {
  const TABLE: Table = Table::Issues;

  fn validate(&self) -> Result<()> {
    required("date", &self.date)?;
    iso_date("date", &self.date)?;
    iso_date("due_by", &self.due_by)?;
    required("description", &self.description)
  }
}

// ─── Materials ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum MaterialKind {
  Request,
  Delivery,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum MaterialStatus {
  Pending,
  Approved,
  Ordered,
  Delivered,
  Cancelled,
}

/// A material request or delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialEntry {
  pub date:      Option<String>,
  #[serde(rename = "type")]
  #[serde(deserialize_with = "lenient::choice")]
  pub kind:      Option<MaterialKind>,
  pub item:      Option<String>,
  pub spec:      Option<String>,
  #[serde(deserialize_with = "lenient::decimal")]
  pub qty:       Option<f64>,
  pub unit:      Option<String>,
  pub needed_by: Option<String>,
  pub supplier:  Option<String>,
  pub po:        Option<String>,
  #[serde(deserialize_with = "lenient::choice")]
  pub status:    Option<MaterialStatus>,
  pub location:  Option<String>,
  pub requester: Option<String>,
  pub photo_url: Option<String>,
}

impl Entry for MaterialEntry {
  const TABLE: Table = Table::Materials;

  fn validate(&self) -> Result<()> {
    required("date", &self.date)?;
    iso_date("date", &self.date)?;
    iso_date("needed_by", &self.needed_by)?;
    required("item", &self.item)
  }
}

// ─── BBS schedule ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum BbsStatus {
  Planned,
  Confirmed,
  Delivered,
  Delayed,
  Cancelled,
}

/// A scheduled rebar delivery from a bar bending schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BbsDelivery {
  pub delivery_date: Option<String>,
  pub element:       Option<String>,
  pub bar_mark:      Option<String>,
  #[serde(deserialize_with = "lenient::decimal")]
  pub diameter_mm:   Option<f64>,
  #[serde(deserialize_with = "lenient::decimal")]
  pub length_m:      Option<f64>,
  #[serde(deserialize_with = "lenient::decimal")]
  pub weight_tons:   Option<f64>,
  pub supplier:      Option<String>,
  #[serde(deserialize_with = "lenient::choice")]
  pub status:        Option<BbsStatus>,
  pub remarks:       Option<String>,
}

impl Entry for BbsDelivery {
  const TABLE: Table = Table::BbsSchedule;

  fn validate(&self) -> Result<()> {
    required("delivery_date", &self.delivery_date)?;
    iso_date("delivery_date", &self.delivery_date)?;
    required("element", &self.element)
  }
}
