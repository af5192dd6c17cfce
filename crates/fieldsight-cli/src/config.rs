//! Connection settings: command-line flags over an optional TOML file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Shape of the optional TOML config file.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ConfigFile {
  #[serde(default)]
  pub url:      String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

impl ConfigFile {
  pub fn read(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")
  }
}

/// Resolved connection settings. Empty credentials mean "anonymous".
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub url:      String,
  pub email:    String,
  pub password: String,
}

impl Settings {
  /// Flags (already merged with their `FIELDSIGHT_*` env fallbacks by clap)
  /// override the file, which overrides defaults.
  pub fn resolve(
    url: Option<String>,
    email: Option<String>,
    password: Option<String>,
    file: ConfigFile,
  ) -> Self {
    fn pick(flag: Option<String>, file: String) -> Option<String> {
      flag.or_else(|| (!file.is_empty()).then_some(file))
    }
    Self {
      url:      pick(url, file.url).unwrap_or_else(|| DEFAULT_URL.to_owned()),
      email:    pick(email, file.email).unwrap_or_default(),
      password: pick(password, file.password).unwrap_or_default(),
    }
  }

  pub fn has_credentials(&self) -> bool { !self.email.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_file() {
    let file: ConfigFile =
      toml::from_str("url = \"https://site.example\"\nemail = \"a@b.c\"\npassword = \"pw\"").unwrap();
    let s = Settings::resolve(None, Some("pm@site.example".into()), None, file);
    assert_eq!(s.url, "https://site.example");
    assert_eq!(s.email, "pm@site.example");
    assert_eq!(s.password, "pw");
    assert!(s.has_credentials());
  }

  #[test]
  fn defaults_without_file() {
    let s = Settings::resolve(None, None, None, ConfigFile::default());
    assert_eq!(s.url, DEFAULT_URL);
    assert!(!s.has_credentials());
  }

  #[test]
  fn partial_file() {
    let file: ConfigFile = toml::from_str("email = \"a@b.c\"").unwrap();
    assert_eq!(file, ConfigFile { email: "a@b.c".into(), ..Default::default() });
  }
}
