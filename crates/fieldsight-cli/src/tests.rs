//! Client tests against a real server bound to an ephemeral port.

use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::Utc;
use fieldsight_api::{ApiConfig, AppState};
use fieldsight_core::{
  aggregate::{DashboardInput, DashboardSummary},
  entry::ConcreteEntry,
  Error,
  profile::{Action, Role},
  store::{ChangeEvent, ChangeKind, Topic},
  table::Table,
};
use fieldsight_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  client::{ApiClient, Notice},
  commands::{self, ManpowerForm},
  context::AppContext,
};

const ADMIN: &str = "pm@site.test";
const PASSWORD: &str = "correct horse";

fn scratch_dir() -> PathBuf {
  let dir = std::env::temp_dir().join(format!("fieldsight-cli-test-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

/// Start a server on `127.0.0.1:0` and return its base URL.
async fn serve() -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let url = format!("http://{}", listener.local_addr().unwrap());

  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let config = ApiConfig {
    public_base_url:   url.clone(),
    upload_dir:        scratch_dir(),
    admin_emails:      vec![ADMIN.to_owned()],
    session_ttl_hours: 1,
  };
  let state = AppState::new(store, config).await.unwrap();
  let app = fieldsight_server::router(state);
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  url
}

/// A signed-in context for a freshly registered account.
async fn signed_in(url: &str, email: &str, full_name: Option<&str>) -> AppContext {
  let client = ApiClient::new(url).unwrap();
  client.sign_up(email, PASSWORD, full_name).await.unwrap();
  let mut ctx = AppContext::new(client);
  ctx.init(email, PASSWORD).await.unwrap();
  ctx
}

fn today() -> String { Utc::now().date_naive().to_string() }

#[tokio::test]
async fn init_and_teardown() {
  let url = serve().await;
  let mut ctx = signed_in(&url, ADMIN, Some("Site PM")).await;

  let profile = ctx.profile().unwrap();
  assert_eq!(profile.email, ADMIN);
  assert_eq!(profile.role, Role::Admin);
  assert_eq!(profile.display_name(), "Site PM");
  assert!(ctx.client().is_signed_in());

  ctx.teardown().await;
  assert!(ctx.profile().is_none());
  assert!(!ctx.client().is_signed_in());
  assert!(ctx.client().me().await.is_err());
}

#[tokio::test]
async fn wrong_password_leaves_context_empty() {
  let url = serve().await;
  let client = ApiClient::new(&url).unwrap();
  client.sign_up("crew@site.test", PASSWORD, None).await.unwrap();

  let mut ctx = AppContext::new(client);
  let err = ctx.init("crew@site.test", "nope-nope").await.unwrap_err();
  assert!(err.to_string().contains("401"), "{err:#}");
  assert!(ctx.profile().is_none());
  assert!(!ctx.client().is_signed_in());
}

#[tokio::test]
async fn export_writes_dated_file() {
  let url = serve().await;
  let ctx = signed_in(&url, ADMIN, None).await;
  let dir = scratch_dir();

  let path = commands::export(&ctx, Table::Concrete, &dir).await.unwrap();
  assert_eq!(path.file_name().unwrap(), format!("concrete_{}.csv", today()).as_str());
  assert_eq!(std::fs::read(&path).unwrap().len(), 0);

  let entry = ConcreteEntry {
    date: Some(today()),
    location: Some("Grid C4, Level 2".into()),
    volume: Some(18.5),
    mix: Some("C30".into()),
    ..Default::default()
  };
  ctx.client().insert(&entry).await.unwrap();

  let path = commands::export(&ctx, Table::Concrete, &dir).await.unwrap();
  let body = std::fs::read_to_string(&path).unwrap();
  let lines: Vec<&str> = body.lines().collect();
  assert_eq!(lines.len(), 2);
  assert!(lines[0].starts_with("date,pour_id,location"));
  assert!(lines[1].contains("\"Grid C4, Level 2\""));
  assert!(lines[1].contains("18.5"));
}

#[tokio::test]
async fn export_needs_admin_and_session() {
  let url = serve().await;
  let dir = scratch_dir();

  let anonymous = AppContext::new(ApiClient::new(&url).unwrap());
  let err = commands::export(&anonymous, Table::Issues, &dir).await.unwrap_err();
  assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotSignedIn)), "{err:#}");

  let crew = signed_in(&url, "crew@site.test", None).await;
  let err = commands::export(&crew, Table::Issues, &dir).await.unwrap_err();
  assert!(
    matches!(err.downcast_ref::<Error>(), Some(Error::Forbidden(Action::Export))),
    "{err:#}"
  );
  assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

#[tokio::test]
async fn log_manpower_with_photo() {
  let url = serve().await;
  let ctx = signed_in(&url, "crew@site.test", Some("Aisha Rahman")).await;

  let photo = scratch_dir().join("deck.png");
  std::fs::write(&photo, b"not really a png").unwrap();

  let record = commands::log_manpower(&ctx, ManpowerForm {
    contractor: "Acme Formwork".into(),
    workers: 12,
    level: "L2".into(),
    zone_letter: "A".into(),
    zone_number: "1".into(),
    notes: "Deck prep".into(),
    photo: Some(photo),
    ..Default::default()
  })
  .await
  .unwrap();

  assert_eq!(record.table, Table::Manpower);
  assert_eq!(record.fields["zone"], "Level L2 | Zone A-1");
  assert_eq!(record.fields["supervisor"], "Aisha Rahman");
  assert_eq!(record.fields["workers"], 12);

  let notes = record.fields["notes"].as_str().unwrap();
  let (text, link) = notes.split_once("\n\nPhoto: ").unwrap();
  assert_eq!(text, "Deck prep");
  assert!(link.starts_with(&format!("{url}/api/storage/manpower-photos/")));
  assert!(link.ends_with(".png"));

  let fetched = reqwest::get(link).await.unwrap();
  assert!(fetched.status().is_success());
  assert_eq!(fetched.bytes().await.unwrap().as_ref(), b"not really a png");
}

#[tokio::test]
async fn failed_photo_upload_still_saves_entry() {
  let url = serve().await;
  let ctx = signed_in(&url, "crew@site.test", None).await;

  let record = commands::log_manpower(&ctx, ManpowerForm {
    contractor: "Acme Formwork".into(),
    workers: 4,
    notes: "Rebar fixing".into(),
    photo: Some(scratch_dir().join("missing.jpg")),
    ..Default::default()
  })
  .await
  .unwrap();

  assert_eq!(record.fields["notes"], "Rebar fixing");
  assert!(record.fields.get("zone").is_none());
  assert_eq!(record.fields["supervisor"], "crew@site.test");
}

#[tokio::test]
async fn tasks_round_trip() {
  let url = serve().await;
  let ctx = signed_in(&url, "crew@site.test", None).await;

  let task = ctx.client().create_task("Pour slab L3", None).await.unwrap();
  assert_eq!(task.task_date, Utc::now().date_naive());

  let tasks = ctx.client().tasks(None).await.unwrap();
  assert_eq!(tasks.len(), 1);
  assert_eq!(tasks[0].id, task.id);

  let snapshot = ctx.client().public_tasks().await.unwrap();
  assert_eq!(snapshot.date, Some(task.task_date));
  assert_eq!(snapshot.tasks[0].title, "Pour slab L3");
  assert_eq!(snapshot.tasks[0].updated_by_name.as_deref(), Some("crew@site.test"));
  assert_eq!(tasks[0].updated_by_name.as_deref(), Some("crew@site.test"));
}

#[test]
fn edited_note_names_the_editor() {
  let at = chrono::DateTime::parse_from_rfc3339("2024-05-02T08:15:00Z").unwrap().to_utc();
  assert_eq!(commands::edited_note(None, Some("Lee")), "");
  assert_eq!(commands::edited_note(Some(at), None), " (edited 2024-05-02 08:15)");
  assert_eq!(commands::edited_note(Some(at), Some("Lee")), " (edited 2024-05-02 08:15 by Lee)");
}

#[tokio::test]
async fn watch_reports_inserts() {
  let url = serve().await;
  let ctx = signed_in(&url, "crew@site.test", None).await;

  let writer = ctx.client().clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(200)).await;
    writer.create_task("Strip formwork", None).await.unwrap();
  });

  let mut seen = Vec::new();
  tokio::time::timeout(
    Duration::from_secs(10),
    commands::watch(&ctx, Some(Topic::DailyTasks), |notice| {
      seen.push(notice.clone());
      false
    }),
  )
  .await
  .unwrap()
  .unwrap();

  match &seen[..] {
    [Notice::Change(event)] => {
      assert_eq!(event.topic, Topic::DailyTasks);
      assert_eq!(event.kind, ChangeKind::Insert);
      assert_eq!(event.task_date, Some(Utc::now().date_naive()));
    }
    other => panic!("unexpected notices: {other:?}"),
  }
}

#[test]
fn dashboard_text_without_data() {
  let summary = DashboardSummary::build(
    DashboardInput { concrete: &[], manpower: &[], issues: &[], materials: &[], bbs: &[] },
    Utc::now().date_naive(),
  );
  let text = commands::render_dashboard(&summary);
  assert!(text.contains("Open issues:         0"));
  assert!(text.contains("Concrete by date:    No data available."));
}

#[test]
fn notice_lines() {
  let id = Uuid::nil();
  let change = Notice::Change(ChangeEvent {
    topic:     Topic::Log(Table::BbsSchedule),
    kind:      ChangeKind::Delete,
    id:        Some(id),
    task_date: None,
  });
  assert_eq!(commands::describe_notice(&change), format!("delete bbs_schedule {id}"));
  assert_eq!(
    commands::describe_notice(&Notice::Lagged { missed: 3 }),
    "lagged: 3 changes missed, refetch everything"
  );

  let parsed: Notice =
    serde_json::from_value(serde_json::json!({"type": "lagged", "missed": 2})).unwrap();
  assert_eq!(parsed, Notice::Lagged { missed: 2 });
}
