//! The signed-in session as the client sees it.

use anyhow::{Result, anyhow};
use fieldsight_core::profile::Profile;

use crate::client::ApiClient;

/// The API client plus the profile of whoever is signed in.
///
/// Built once per command: [`AppContext::init`] signs in and loads the
/// profile, [`AppContext::teardown`] signs out and forgets both.
pub struct AppContext {
  client:  ApiClient,
  profile: Option<Profile>,
}

impl AppContext {
  pub fn new(client: ApiClient) -> Self { Self { client, profile: None } }

  pub fn client(&self) -> &ApiClient { &self.client }

  pub fn profile(&self) -> Option<&Profile> { self.profile.as_ref() }

  /// The signed-in profile, or an error naming what needed it.
  pub fn require_profile(&self, what: &str) -> Result<&Profile> {
    self
      .profile
      .as_ref()
      .ok_or_else(|| anyhow!("{what} requires signing in (set --email and --password)"))
  }

  /// Sign in and fetch the caller's profile.
  pub async fn init(&mut self, email: &str, password: &str) -> Result<&Profile> {
    self.client.sign_in(email, password).await?;
    let profile = self.client.me().await?;
    tracing::debug!(email = %profile.email, role = %profile.role, "signed in");
    Ok(self.profile.insert(profile))
  }

  /// Sign out and clear the session and profile. A failed sign-out is
  /// logged; local state is cleared either way.
  pub async fn teardown(&mut self) {
    if let Err(e) = self.client.sign_out().await {
      tracing::warn!("sign-out failed: {e:#}");
    }
    self.profile = None;
  }
}
