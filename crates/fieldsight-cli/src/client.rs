//! Async HTTP client wrapping the FieldSight JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use fieldsight_core::{
  aggregate::DashboardSummary,
  entry::Entry,
  profile::Profile,
  record::Record,
  store::{ChangeEvent, Topic},
  table::Table,
  task::DailyTask,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Seconds the server is asked to hold a change poll open.
pub const POLL_SECS: u64 = 25;

#[derive(Debug, Clone, Deserialize)]
pub struct SignedIn {
  pub token:   String,
  pub profile: Profile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Uploaded {
  pub path:       String,
  pub public_url: String,
}

/// A write notification from `GET /changes`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
  Change(ChangeEvent),
  Lagged { missed: u64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublicTask {
  pub title:           String,
  pub status:          fieldsight_core::task::TaskStatus,
  pub verified:        bool,
  pub remarks:         Option<String>,
  #[serde(default)]
  pub updated_at:      Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_by_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSnapshot {
  pub date:  Option<NaiveDate>,
  pub tasks: Vec<PublicTask>,
}

/// Async HTTP client for the FieldSight REST API.
///
/// Holds the bearer token once signed in. Cheap to clone; the inner
/// [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
  token:    Option<String>,
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp
    .json::<serde_json::Value>()
    .await
    .ok()
    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
    .unwrap_or_default();
  if message.is_empty() {
    Err(anyhow!("{what} → {status}"))
  } else {
    Err(anyhow!("{what} → {status}: {message}"))
  }
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      // Long enough for a change poll to come back on its own.
      .timeout(Duration::from_secs(POLL_SECS + 10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into(), token: None })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  pub fn is_signed_in(&self) -> bool { self.token.is_some() }

  // ── Auth ──────────────────────────────────────────────────────────────────

  /// `POST /api/auth/sign-up`
  pub async fn sign_up(
    &self,
    email: &str,
    password: &str,
    full_name: Option<&str>,
  ) -> Result<Profile> {
    let resp = self
      .client
      .post(self.url("/auth/sign-up"))
      .json(&json!({ "email": email, "password": password, "full_name": full_name }))
      .send()
      .await
      .context("POST /auth/sign-up failed")?;
    check(resp, "POST /auth/sign-up")
      .await?
      .json()
      .await
      .context("deserialising profile")
  }

  /// `POST /api/auth/sign-in`; keeps the returned token for later requests.
  pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Profile> {
    let resp = self
      .client
      .post(self.url("/auth/sign-in"))
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await
      .context("POST /auth/sign-in failed")?;
    let signed_in: SignedIn = check(resp, "POST /auth/sign-in")
      .await?
      .json()
      .await
      .context("deserialising sign-in response")?;
    self.token = Some(signed_in.token);
    Ok(signed_in.profile)
  }

  /// `POST /api/auth/sign-out`. The token is dropped even if the request
  /// fails.
  pub async fn sign_out(&mut self) -> Result<()> {
    let Some(token) = self.token.take() else {
      return Ok(());
    };
    let resp = self
      .client
      .post(self.url("/auth/sign-out"))
      .bearer_auth(token)
      .send()
      .await
      .context("POST /auth/sign-out failed")?;
    check(resp, "POST /auth/sign-out").await?;
    Ok(())
  }

  /// `GET /api/auth/me`
  pub async fn me(&self) -> Result<Profile> {
    let resp = self
      .auth(self.client.get(self.url("/auth/me")))
      .send()
      .await
      .context("GET /auth/me failed")?;
    check(resp, "GET /auth/me")
      .await?
      .json()
      .await
      .context("deserialising profile")
  }

  // ── Log tables ────────────────────────────────────────────────────────────

  /// `GET /api/tables/{table}`
  pub async fn list(&self, table: Table) -> Result<Vec<Record>> {
    let path = format!("/tables/{table}");
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    check(resp, &format!("GET {path}"))
      .await?
      .json()
      .await
      .context("deserialising records")
  }

  /// `POST /api/tables/{table}` with a typed entry.
  pub async fn insert<E: Entry>(&self, entry: &E) -> Result<Record> {
    let path = format!("/tables/{}", E::TABLE);
    let resp = self
      .auth(self.client.post(self.url(&path)))
      .json(entry)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    check(resp, &format!("POST {path}"))
      .await?
      .json()
      .await
      .context("deserialising record")
  }

  /// `GET /api/tables/{table}/export`; the CSV body as text.
  pub async fn export(&self, table: Table) -> Result<String> {
    let path = format!("/tables/{table}/export");
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    check(resp, &format!("GET {path}"))
      .await?
      .text()
      .await
      .context("reading export body")
  }

  // ── Daily tasks ───────────────────────────────────────────────────────────

  /// `GET /api/tasks[?date=...]`
  pub async fn tasks(&self, date: Option<NaiveDate>) -> Result<Vec<DailyTask>> {
    let mut req = self.auth(self.client.get(self.url("/tasks")));
    if let Some(date) = date {
      req = req.query(&[("date", date.to_string())]);
    }
    let resp = req.send().await.context("GET /tasks failed")?;
    check(resp, "GET /tasks")
      .await?
      .json()
      .await
      .context("deserialising tasks")
  }

  /// `POST /api/tasks`
  pub async fn create_task(&self, title: &str, date: Option<NaiveDate>) -> Result<DailyTask> {
    let resp = self
      .auth(self.client.post(self.url("/tasks")))
      .json(&json!({ "title": title, "task_date": date }))
      .send()
      .await
      .context("POST /tasks failed")?;
    check(resp, "POST /tasks")
      .await?
      .json()
      .await
      .context("deserialising task")
  }

  // ── Public ────────────────────────────────────────────────────────────────

  /// `GET /api/public/dashboard`
  pub async fn dashboard(&self) -> Result<DashboardSummary> {
    let resp = self
      .client
      .get(self.url("/public/dashboard"))
      .send()
      .await
      .context("GET /public/dashboard failed")?;
    check(resp, "GET /public/dashboard")
      .await?
      .json()
      .await
      .context("deserialising dashboard")
  }

  /// `GET /api/public/tasks`
  pub async fn public_tasks(&self) -> Result<TaskSnapshot> {
    let resp = self
      .client
      .get(self.url("/public/tasks"))
      .send()
      .await
      .context("GET /public/tasks failed")?;
    check(resp, "GET /public/tasks")
      .await?
      .json()
      .await
      .context("deserialising task snapshot")
  }

  // ── Realtime ──────────────────────────────────────────────────────────────

  /// `GET /api/changes`. `None` when the poll timed out with nothing new.
  pub async fn next_change(&self, topic: Option<Topic>, timeout_secs: u64) -> Result<Option<Notice>> {
    let mut req = self
      .auth(self.client.get(self.url("/changes")))
      .query(&[("timeout_secs", timeout_secs.to_string())]);
    if let Some(topic) = topic {
      req = req.query(&[("table", topic.to_string())]);
    }
    let resp = req.send().await.context("GET /changes failed")?;
    let resp = check(resp, "GET /changes").await?;
    if resp.status() == StatusCode::NO_CONTENT {
      return Ok(None);
    }
    resp.json().await.map(Some).context("deserialising change notice")
  }

  // ── Storage ───────────────────────────────────────────────────────────────

  /// `POST /api/storage/{bucket}?ext=...` with the raw file bytes.
  pub async fn upload(&self, bucket: &str, ext: Option<&str>, bytes: Vec<u8>) -> Result<Uploaded> {
    let path = format!("/storage/{bucket}");
    let mut req = self.auth(self.client.post(self.url(&path))).body(bytes);
    if let Some(ext) = ext {
      req = req.query(&[("ext", ext)]);
    }
    let resp = req.send().await.with_context(|| format!("POST {path} failed"))?;
    check(resp, &format!("POST {path}"))
      .await?
      .json()
      .await
      .context("deserialising upload response")
  }
}
