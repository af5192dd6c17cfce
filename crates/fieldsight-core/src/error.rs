//! Error types for `fieldsight-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::profile::Action;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown table: {0:?}")]
  UnknownTable(String),

  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("invalid value for {field}: {reason}")]
  InvalidField { field: &'static str, reason: String },

  #[error("task not found: {0}")]
  TaskNotFound(Uuid),

  #[error("sign in required")]
  NotSignedIn,

  #[error("not permitted: {0}")]
  Forbidden(Action),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
