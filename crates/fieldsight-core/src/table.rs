//! The named log tables and their per-table conventions.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// One of the site-log collections. Every record belongs to exactly one.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
  Concrete,
  Manpower,
  Issues,
  Materials,
  BbsSchedule,
}

impl Table {
  /// The field holding the calendar date a record is bucketed under.
  pub fn date_field(self) -> &'static str {
    match self {
      Self::BbsSchedule => "delivery_date",
      _ => "date",
    }
  }

  /// Column order used when exporting this table to CSV.
  pub fn export_columns(self) -> &'static [&'static str] {
    match self {
      Self::Concrete => &[
        "date",
        "pour_id",
        "location",
        "element",
        "volume",
        "mix",
        "supplier",
        "start_time",
        "end_time",
        "cubes",
        "supervisor",
        "notes",
        "user_id",
        "created_at",
      ],
      Self::Manpower => &[
        "date",
        "contractor",
        "trade",
        "workers",
        "shift",
        "hours",
        "zone",
        "supervisor",
        "notes",
        "user_id",
        "created_at",
      ],
      Self::Issues => &[
        "date",
        "location",
        "description",
        "severity",
        "status",
        "raised_by",
        "owner",
        "due_by",
        "photo_url",
        "user_id",
        "created_at",
      ],
      Self::Materials => &[
        "date",
        "type",
        "item",
        "spec",
        "qty",
        "unit",
        "needed_by",
        "supplier",
        "po",
        "status",
        "location",
        "requester",
        "photo_url",
        "user_id",
        "created_at",
      ],
      Self::BbsSchedule => &[
        "delivery_date",
        "element",
        "bar_mark",
        "diameter_mm",
        "length_m",
        "weight_tons",
        "supplier",
        "status",
        "remarks",
        "user_id",
        "created_at",
      ],
    }
  }
}
