//! `fieldsight`: command-line client for the FieldSight site log.
//!
//! # Usage
//!
//! ```text
//! fieldsight --url http://localhost:8080 --email pm@site.example --password secret export concrete
//! fieldsight --config ~/.config/fieldsight/config.toml dashboard
//! fieldsight log-manpower --contractor "Acme Formwork" --workers 12 --level L2 --zone A --zone-number 1
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fieldsight_cli::{
  client::ApiClient,
  commands::{self, ManpowerForm},
  config::{ConfigFile, Settings},
  context::AppContext,
};
use fieldsight_core::{store::Topic, table::Table};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fieldsight", about = "Command-line client for the FieldSight site log")]
struct Args {
  /// Path to a TOML config file (url, email, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the FieldSight server (default: http://localhost:8080).
  #[arg(long, env = "FIELDSIGHT_URL")]
  url: Option<String>,

  /// Account email.
  #[arg(long, env = "FIELDSIGHT_EMAIL")]
  email: Option<String>,

  /// Account password (plaintext).
  #[arg(long, env = "FIELDSIGHT_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Download a log table as CSV (admin only).
  Export {
    table: Table,
    /// Directory to write `{table}_{date}.csv` into.
    #[arg(long, default_value = ".")]
    dir:   PathBuf,
  },
  /// Print the public dashboard summary.
  Dashboard,
  /// List daily tasks for a date (default: today, with carry-over).
  Tasks {
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Show the public snapshot of the latest task date instead.
    #[arg(long, conflicts_with = "date")]
    public: bool,
  },
  /// Add a daily task.
  AddTask {
    title: String,
    #[arg(long)]
    date:  Option<NaiveDate>,
  },
  /// Record a manpower entry, optionally with a site photo.
  LogManpower {
    #[arg(long)]
    date:        Option<NaiveDate>,
    #[arg(long)]
    contractor:  String,
    #[arg(long)]
    trade:       Option<String>,
    #[arg(long)]
    workers:     u32,
    #[arg(long)]
    shift:       Option<String>,
    #[arg(long)]
    hours:       Option<f64>,
    #[arg(long, default_value = "")]
    level:       String,
    #[arg(long = "zone", default_value = "")]
    zone_letter: String,
    #[arg(long, default_value = "")]
    zone_number: String,
    #[arg(long)]
    supervisor:  Option<String>,
    #[arg(long, default_value = "")]
    notes:       String,
    #[arg(long)]
    photo:       Option<PathBuf>,
  },
  /// Print a line for every write until interrupted.
  Watch {
    /// A log table name or `daily_tasks`.
    #[arg(long)]
    table: Option<Topic>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg = match &args.config {
    Some(path) => ConfigFile::read(path)?,
    None => ConfigFile::default(),
  };
  let settings = Settings::resolve(args.url, args.email, args.password, file_cfg);

  let mut ctx = AppContext::new(ApiClient::new(&settings.url)?);
  if settings.has_credentials() {
    ctx
      .init(&settings.email, &settings.password)
      .await
      .context("signing in")?;
  }

  let result = run(&ctx, args.command).await;
  if ctx.profile().is_some() {
    ctx.teardown().await;
  }
  result
}

async fn run(ctx: &AppContext, command: Command) -> Result<()> {
  match command {
    Command::Export { table, dir } => {
      let path = commands::export(ctx, table, &dir).await?;
      println!("{}", path.display());
    }
    Command::Dashboard => {
      let summary = ctx.client().dashboard().await?;
      println!("{}", commands::render_dashboard(&summary));
    }
    Command::Tasks { public: true, .. } => {
      let snapshot = ctx.client().public_tasks().await?;
      match snapshot.date {
        Some(date) => println!("{date}"),
        None => println!("No tasks recorded."),
      }
      for t in snapshot.tasks {
        let mark = if t.verified { "✓" } else { " " };
        let edited = commands::edited_note(t.updated_at, t.updated_by_name.as_deref());
        println!("[{mark}] {:<9} {}{edited}", t.status, t.title);
      }
    }
    Command::Tasks { date, .. } => {
      ctx.require_profile("tasks")?;
      for t in ctx.client().tasks(date).await? {
        let mark = if t.verified { "✓" } else { " " };
        let carried = if t.carry_over_from.is_some() { " (carried over)" } else { "" };
        let edited = commands::edited_note(t.updated_at, t.updated_by_name.as_deref());
        println!("[{mark}] {:<9} {}{carried}{edited}", t.status, t.title);
      }
    }
    Command::AddTask { title, date } => {
      ctx.require_profile("add-task")?;
      let task = ctx.client().create_task(&title, date).await?;
      println!("{} {}", task.id, task.task_date);
    }
    Command::LogManpower {
      date,
      contractor,
      trade,
      workers,
      shift,
      hours,
      level,
      zone_letter,
      zone_number,
      supervisor,
      notes,
      photo,
    } => {
      let form = ManpowerForm {
        date,
        contractor,
        trade,
        workers,
        shift,
        hours,
        level,
        zone_letter,
        zone_number,
        supervisor,
        notes,
        photo,
      };
      let record = commands::log_manpower(ctx, form).await?;
      println!("{}", record.id);
    }
    Command::Watch { table } => {
      commands::watch(ctx, table, |notice| {
        println!("{}", commands::describe_notice(notice));
        true
      })
      .await?;
    }
  }
  Ok(())
}
