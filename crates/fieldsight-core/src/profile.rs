//! User profiles, roles, and the single authorization check.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  Supervisor,
}

/// The role lookup attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub id:        Uuid,
  pub email:     String,
  pub role:      Role,
  pub full_name: Option<String>,
  /// Last four digits of the holder's identity card.
  pub ic_last4:  Option<String>,
}

impl Profile {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Full name if set, otherwise the email address.
  pub fn display_name(&self) -> &str {
    self
      .full_name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .unwrap_or(&self.email)
  }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileUpdate {
  pub full_name: Option<String>,
  pub ic_last4:  Option<String>,
}

impl ProfileUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(ic) = &self.ic_last4
      && !(ic.len() == 4 && ic.bytes().all(|b| b.is_ascii_digit()))
    {
      return Err(Error::InvalidField {
        field:  "ic_last4",
        reason: "must be exactly four digits".into(),
      });
    }
    Ok(())
  }
}

/// A privileged action gated on role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
  Export,
  ClearAll,
  DeleteRecord,
  DeleteTask,
  VerifyTask,
}

impl Role {
  pub fn permits(self, action: Action) -> bool {
    match action {
      Action::Export
      | Action::ClearAll
      | Action::DeleteRecord
      | Action::DeleteTask
      | Action::VerifyTask => self == Self::Admin,
    }
  }
}

/// The one place privileged actions are checked. Every handler for an
/// [`Action`] calls this before touching the store.
pub fn authorize(profile: Option<&Profile>, action: Action) -> Result<()> {
  let profile = profile.ok_or(Error::NotSignedIn)?;
  if profile.role.permits(action) {
    Ok(())
  } else {
    tracing::warn!(user = %profile.email, %action, "privileged action refused");
    Err(Error::Forbidden(action))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn profile(role: Role) -> Profile {
    Profile {
      id: Uuid::new_v4(),
      email: "site@example.com".into(),
      role,
      full_name: None,
      ic_last4: None,
    }
  }

  #[test]
  fn admin_may_do_everything() {
    let admin = profile(Role::Admin);
    for action in [
      Action::Export,
      Action::ClearAll,
      Action::DeleteRecord,
      Action::DeleteTask,
      Action::VerifyTask,
    ] {
      authorize(Some(&admin), action).unwrap();
    }
  }

  #[test]
  fn supervisor_is_refused() {
    let sup = profile(Role::Supervisor);
    assert!(matches!(
      authorize(Some(&sup), Action::ClearAll),
      Err(Error::Forbidden(Action::ClearAll))
    ));
  }

  #[test]
  fn anonymous_is_not_signed_in() {
    assert!(matches!(authorize(None, Action::Export), Err(Error::NotSignedIn)));
  }

  #[test]
  fn ic_last4_must_be_four_digits() {
    let ok = ProfileUpdate { full_name: None, ic_last4: Some("0421".into()) };
    ok.validate().unwrap();
    let bad = ProfileUpdate { full_name: None, ic_last4: Some("42a".into()) };
    assert!(bad.validate().is_err());
  }

  #[test]
  fn display_name_prefers_full_name() {
    let mut p = profile(Role::Supervisor);
    assert_eq!(p.display_name(), "site@example.com");
    p.full_name = Some("Aisyah Rahman".into());
    assert_eq!(p.display_name(), "Aisyah Rahman");
  }
}
