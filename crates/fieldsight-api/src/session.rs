//! Bearer-token sessions and password hashing.
//!
//! A session token is 32 random bytes, URL-safe base64 encoded. Only its
//! SHA-256 digest is stored, so a leaked database cannot be replayed.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::Utc;
use fieldsight_core::profile::Profile;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::{AppState, Backend, error::ApiError};

/// The signed-in caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct Session {
  pub profile:    Profile,
  pub token_hash: String,
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh token and the digest to store for it.
pub fn issue_token() -> (String, String) {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = B64.encode(bytes);
  let digest = hash_token(&token);
  (token, digest)
}

pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Store(format!("argon2 error: {e}").into()))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

// ─── Extractor ───────────────────────────────────────────────────────────────

impl<S: Backend> FromRequestParts<AppState<S>> for Session {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)
      .ok_or_else(|| ApiError::Unauthorized("sign in required".into()))?;
    let token_hash = hash_token(token);

    let profile = state
      .store
      .resolve_session(token_hash.clone(), Utc::now())
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| {
        tracing::warn!("unknown or expired session token");
        ApiError::Unauthorized("session expired".into())
      })?;

    Ok(Session { profile, token_hash })
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn tokens_are_unique_and_hashed() {
    let (a, a_hash) = issue_token();
    let (b, _) = issue_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert_eq!(a_hash, hash_token(&a));
    assert_eq!(a_hash.len(), 64);
  }

  #[test]
  fn bearer_header_parsing() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
    assert_eq!(bearer_token(&headers), Some("abc123"));
  }

  #[test]
  fn password_round_trip() {
    let phc = hash_password("hunter22").unwrap();
    assert!(verify_password("hunter22", &phc));
    assert!(!verify_password("hunter23", &phc));
    assert!(!verify_password("hunter22", "not a phc string"));
  }
}
