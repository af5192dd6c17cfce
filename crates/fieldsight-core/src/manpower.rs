//! Text encodings used by manpower entries.
//!
//! Location is stored as a single `zone` string (`Level L2 | Zone A-1`) and a
//! site photo is appended to the free-text notes (`...\n\nPhoto: <url>`).
//! Both formats exist in stored data and must keep decoding exactly.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const SHIFT_OPTIONS: &[&str] = &["AM", "PM", "Evening"];
pub const LEVEL_OPTIONS: &[&str] =
  &["Basement", "L1", "L2", "L3", "L4", "L5", "L6", "L7", "L8", "L9", "L10"];
pub const ZONE_LETTERS: &[&str] = &["A", "B", "C", "D", "E"];
pub const ZONE_NUMBERS: &[&str] = &["1", "2"];

static LEVEL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)Level\s+([^|]+)").expect("valid level regex"));
static ZONE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)Zone\s+([A-Z])(?:-([0-9]+))?").expect("valid zone regex")
});
static PHOTO_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)Photo:\s*(\S+)").expect("valid photo regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid newline regex"));

// ─── Zone ────────────────────────────────────────────────────────────────────

/// The parts of a manpower `zone` string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
  pub level:       String,
  pub zone_letter: String,
  pub zone_number: String,
}

/// Format `Level {level} | Zone {letter}-{number}`, leaving out whatever is
/// blank. A number without a letter is dropped.
pub fn encode_zone(level: &str, zone_letter: &str, zone_number: &str) -> String {
  let level = level.trim();
  let letter = zone_letter.trim();
  let number = zone_number.trim();

  let mut parts = Vec::with_capacity(2);
  if !level.is_empty() {
    parts.push(format!("Level {level}"));
  }
  if !letter.is_empty() {
    if number.is_empty() {
      parts.push(format!("Zone {letter}"));
    } else {
      parts.push(format!("Zone {letter}-{number}"));
    }
  }
  parts.join(" | ")
}

/// Best-effort inverse of [`encode_zone`]. Anything that doesn't match comes
/// back empty.
pub fn decode_zone(value: &str) -> Zone {
  let level = LEVEL_RE
    .captures(value)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().trim().to_owned())
    .unwrap_or_default();

  let (zone_letter, zone_number) = match ZONE_RE.captures(value) {
    Some(c) => (
      c.get(1).map(|m| m.as_str().to_uppercase()).unwrap_or_default(),
      c.get(2).map(|m| m.as_str().to_owned()).unwrap_or_default(),
    ),
    None => (String::new(), String::new()),
  };

  Zone { level, zone_letter, zone_number }
}

// ─── Notes ───────────────────────────────────────────────────────────────────

/// Free-text notes with the photo link pulled out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
  pub notes_text: String,
  pub photo_url:  String,
}

/// Append `Photo: {url}` to the notes, separated by a blank line.
pub fn pack_notes(notes_text: &str, photo_url: &str) -> String {
  let text = notes_text.trim();
  let url = photo_url.trim();

  let mut segments = Vec::with_capacity(2);
  if !text.is_empty() {
    segments.push(text.to_owned());
  }
  if !url.is_empty() {
    segments.push(format!("Photo: {url}"));
  }
  segments.join("\n\n")
}

/// Split packed notes back into text and photo URL.
///
/// Only the first `Photo:` token is extracted; blank-line runs left behind
/// collapse to a single newline.
pub fn unpack_notes(combined: &str) -> Notes {
  let (photo_url, remaining) = match PHOTO_RE.captures(combined) {
    Some(c) => {
      let whole = c.get(0).map_or("", |m| m.as_str());
      let url = c.get(1).map_or("", |m| m.as_str()).trim().to_owned();
      (url, combined.replacen(whole, "", 1))
    }
    None => (String::new(), combined.to_owned()),
  };

  let notes_text = BLANK_LINES_RE.replace_all(&remaining, "\n").trim().to_owned();
  Notes { notes_text, photo_url }
}
