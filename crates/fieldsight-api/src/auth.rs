//! Handlers for `/auth` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/auth/sign-up` | Body: `{"email","password","full_name"?}` |
//! | `POST`  | `/auth/sign-in` | Body: `{"email","password"}`, returns a bearer token |
//! | `POST`  | `/auth/sign-out` | Revokes the presented token |
//! | `GET`   | `/auth/me` | Current profile |
//! | `PATCH` | `/auth/me` | Body: `{"full_name"?, "ic_last4"?}` |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use fieldsight_core::profile::{Profile, ProfileUpdate, Role};
use serde::{Deserialize, Serialize};

use crate::{
  AppState, Backend,
  error::ApiError,
  session::{Session, hash_password, issue_token, verify_password},
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SignUpBody {
  pub email:     String,
  pub password:  String,
  pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
  pub token:   String,
  pub profile: Profile,
}

fn normalize_email(email: &str) -> Result<String, ApiError> {
  let email = email.trim().to_lowercase();
  if email.is_empty() || !email.contains('@') {
    return Err(ApiError::BadRequest("a valid email is required".into()));
  }
  Ok(email)
}

// ─── Sign up ──────────────────────────────────────────────────────────────────

/// `POST /auth/sign-up`
pub async fn sign_up<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignUpBody>,
) -> Result<impl IntoResponse, ApiError> {
  let email = normalize_email(&body.email)?;
  if body.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::BadRequest(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }

  let role = if state.config.is_admin_email(&email) { Role::Admin } else { Role::Supervisor };
  let full_name = body.full_name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
  let hash = hash_password(&body.password)?;

  let profile = state
    .store
    .create_account(email, hash, role, full_name)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Conflict("email already registered".into()))?;

  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Sign in / out ────────────────────────────────────────────────────────────

/// `POST /auth/sign-in`
pub async fn sign_in<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignInBody>,
) -> Result<Json<SignInResponse>, ApiError> {
  let email = normalize_email(&body.email)?;
  let refused = || {
    tracing::warn!(%email, "sign-in refused");
    ApiError::Unauthorized("invalid email or password".into())
  };

  let creds = state
    .store
    .credentials(email.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(refused)?;
  if !verify_password(&body.password, &creds.password_hash) {
    return Err(refused());
  }

  let (token, token_hash) = issue_token();
  let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);
  state
    .store
    .create_session(token_hash, creds.profile.id, expires_at)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(%email, "signed in");
  Ok(Json(SignInResponse { token, profile: creds.profile }))
}

/// `POST /auth/sign-out`
pub async fn sign_out<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .revoke_session(session.token_hash)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Profile ──────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me<S: Backend>(session: Session) -> Json<Profile> { Json(session.profile) }

/// `PATCH /auth/me`
pub async fn update_me<S: Backend>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
  update.validate()?;
  let profile = state
    .store
    .update_profile(session.profile.id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;
  Ok(Json(profile))
}
