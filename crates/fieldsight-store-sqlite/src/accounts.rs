//! [`AccountStore`] for [`SqliteStore`]: profiles, credentials and sessions.

use chrono::{DateTime, Utc};
use fieldsight_core::{
  profile::{Profile, ProfileUpdate, Role},
  store::{AccountStore, Credentials},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  encode::{RawProfile, encode_dt, encode_uuid, now},
};

impl SqliteStore {
  async fn profile_where(&self, clause: &'static str, arg: String) -> Result<Option<Profile>> {
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM profiles WHERE {clause}", RawProfile::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![arg], RawProfile::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }
}

impl AccountStore for SqliteStore {
  type Error = crate::Error;

  async fn create_account(
    &self,
    email: String,
    password_hash: String,
    role: Role,
    full_name: Option<String>,
  ) -> Result<Option<Profile>> {
    let profile = Profile { id: Uuid::new_v4(), email, role, full_name, ic_last4: None };

    let id_str = encode_uuid(profile.id);
    let email = profile.email.clone();
    let role_str = role.to_string();
    let full_name = profile.full_name.clone();
    let at_str = encode_dt(now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO profiles (id, email, password_hash, role, full_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(email) DO NOTHING",
          rusqlite::params![id_str, email, password_hash, role_str, full_name, at_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Ok(None);
    }
    tracing::info!(email = %profile.email, role = %profile.role, "account created");
    Ok(Some(profile))
  }

  async fn credentials(&self, email: String) -> Result<Option<Credentials>> {
    let row: Option<(RawProfile, String)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {}, password_hash FROM profiles WHERE email = ?1",
          RawProfile::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![email], |r| {
              Ok((RawProfile::from_row(r)?, r.get(5)?))
            })
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(raw, password_hash)| {
        Ok(Credentials { profile: raw.into_profile()?, password_hash })
      })
      .transpose()
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    self.profile_where("id = ?1", encode_uuid(id)).await
  }

  async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<Option<Profile>> {
    update.validate()?;
    let id_str = encode_uuid(id);
    let ProfileUpdate { full_name, ic_last4 } = update;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles
           SET full_name = COALESCE(?2, full_name),
               ic_last4  = COALESCE(?3, ic_last4)
           WHERE id = ?1",
          rusqlite::params![id_str, full_name, ic_last4],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_profile(id).await
  }

  async fn create_session(
    &self,
    token_hash: String,
    profile_id: Uuid,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let profile_str = encode_uuid(profile_id);
    let at_str = encode_dt(now());
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, profile_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_hash, profile_str, at_str, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve_session(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> Result<Option<Profile>> {
    let now_str = encode_dt(now);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        // Expired sessions are dropped lazily, on lookup.
        conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", rusqlite::params![now_str])?;
        let sql = format!(
          "SELECT {} FROM profiles p JOIN sessions s ON s.profile_id = p.id
           WHERE s.token_hash = ?1",
          prefixed_profile_columns()
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![token_hash], RawProfile::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn revoke_session(&self, token_hash: String) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }
}

fn prefixed_profile_columns() -> String {
  RawProfile::COLUMNS
    .split(", ")
    .map(|c| format!("p.{c}"))
    .collect::<Vec<_>>()
    .join(", ")
}
