//! What each subcommand does, independent of argument parsing and output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fieldsight_core::{
  aggregate::{DashboardSummary, summarize_breakdown, summarize_series},
  entry::ManpowerEntry,
  manpower::{encode_zone, pack_notes},
  profile::{Action, authorize},
  record::Record,
  store::Topic,
  table::Table,
};

use crate::{
  client::{Notice, POLL_SECS},
  context::AppContext,
};

/// Bucket manpower photos are uploaded to.
pub const MANPOWER_PHOTO_BUCKET: &str = "manpower-photos";

// ─── Export ──────────────────────────────────────────────────────────────────

/// Download `table` as CSV into `dir`, named for today's date. An empty table
/// still produces a (zero-byte) file. Refused locally unless the signed-in
/// profile may export.
pub async fn export(ctx: &AppContext, table: Table, dir: &Path) -> Result<PathBuf> {
  authorize(ctx.profile(), Action::Export)?;
  let body = ctx.client().export(table).await?;
  let path = dir.join(fieldsight_csv::download_file_name(table, Utc::now().date_naive()));
  tokio::fs::write(&path, body.as_bytes())
    .await
    .with_context(|| format!("writing {}", path.display()))?;
  Ok(path)
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// Plain-text rendering of the dashboard summary.
pub fn render_dashboard(s: &DashboardSummary) -> String {
  [
    format!("Concrete poured:     {} m³", s.total_concrete_m3),
    format!("Workers logged:      {}", s.total_workers),
    format!("Open issues:         {}", s.open_issues),
    format!("Active material POs: {}", s.active_material_orders),
    format!(
      "Upcoming BBS:        {} deliveries, {} t",
      s.upcoming_bbs_deliveries, s.upcoming_bbs_tons
    ),
    String::new(),
    format!("Concrete by date:    {}", summarize_series(&s.concrete_by_date, "m³")),
    format!("Manpower by date:    {}", summarize_series(&s.manpower_by_date, "workers")),
    format!("BBS by date:         {}", summarize_series(&s.bbs_by_date, "t")),
    format!("Materials by status: {}", summarize_breakdown(&s.materials_by_status)),
    format!("Issues by severity:  {}", summarize_breakdown(&s.issues_by_severity)),
  ]
  .join("\n")
}

// ─── Tasks ───────────────────────────────────────────────────────────────────

/// ` (edited 2024-05-02 08:15 by Name)`, or empty for a task never edited.
pub fn edited_note(updated_at: Option<DateTime<Utc>>, by: Option<&str>) -> String {
  let Some(at) = updated_at else {
    return String::new();
  };
  match by {
    Some(name) => format!(" (edited {} by {name})", at.format("%Y-%m-%d %H:%M")),
    None => format!(" (edited {})", at.format("%Y-%m-%d %H:%M")),
  }
}

// ─── Manpower ────────────────────────────────────────────────────────────────

/// The manpower form as the command line collects it.
#[derive(Debug, Clone, Default)]
pub struct ManpowerForm {
  pub date:        Option<NaiveDate>,
  pub contractor:  String,
  pub trade:       Option<String>,
  pub workers:     u32,
  pub shift:       Option<String>,
  pub hours:       Option<f64>,
  pub level:       String,
  pub zone_letter: String,
  pub zone_number: String,
  pub supervisor:  Option<String>,
  pub notes:       String,
  pub photo:       Option<PathBuf>,
}

/// Upload the photo (if any), then insert the entry.
///
/// A failed upload is logged and the entry is saved without a photo link.
pub async fn log_manpower(ctx: &AppContext, form: ManpowerForm) -> Result<Record> {
  let profile = ctx.require_profile("log-manpower")?;

  let photo_url = match &form.photo {
    Some(path) => upload_photo(ctx, path).await.unwrap_or_else(|e| {
      tracing::warn!(photo = %path.display(), "photo upload failed, saving without it: {e:#}");
      String::new()
    }),
    None => String::new(),
  };

  let zone = encode_zone(&form.level, &form.zone_letter, &form.zone_number);
  let notes = pack_notes(&form.notes, &photo_url);
  let entry = ManpowerEntry {
    date:       Some(form.date.unwrap_or_else(|| Utc::now().date_naive()).to_string()),
    contractor: Some(form.contractor),
    trade:      form.trade,
    workers:    Some(form.workers),
    shift:      form.shift,
    hours:      form.hours,
    zone:       (!zone.is_empty()).then_some(zone),
    supervisor: form.supervisor.or_else(|| Some(profile.display_name().to_owned())),
    notes:      (!notes.is_empty()).then_some(notes),
  };

  ctx.client().insert(&entry).await
}

async fn upload_photo(ctx: &AppContext, path: &Path) -> Result<String> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("reading {}", path.display()))?;
  let ext = path.extension().and_then(|e| e.to_str());
  let uploaded = ctx.client().upload(MANPOWER_PHOTO_BUCKET, ext, bytes).await?;
  Ok(uploaded.public_url)
}

// ─── Watch ───────────────────────────────────────────────────────────────────

/// One line per change notice.
pub fn describe_notice(notice: &Notice) -> String {
  match notice {
    Notice::Change(event) => {
      let mut line = format!("{:?} {}", event.kind, event.topic).to_lowercase();
      if let Some(id) = event.id {
        line.push_str(&format!(" {id}"));
      }
      if let Some(date) = event.task_date {
        line.push_str(&format!(" ({date})"));
      }
      line
    }
    Notice::Lagged { missed } => format!("lagged: {missed} changes missed, refetch everything"),
  }
}

/// Poll for changes until `on_notice` returns `false`. Timeouts just poll
/// again.
pub async fn watch(
  ctx: &AppContext,
  topic: Option<Topic>,
  mut on_notice: impl FnMut(&Notice) -> bool,
) -> Result<()> {
  ctx.require_profile("watch")?;
  loop {
    match ctx.client().next_change(topic, POLL_SECS).await? {
      Some(notice) => {
        if !on_notice(&notice) {
          return Ok(());
        }
      }
      None => tracing::debug!("change poll timed out"),
    }
  }
}
