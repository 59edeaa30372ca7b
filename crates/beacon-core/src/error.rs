//! Error types for `beacon-core`.
//!
//! Every store backend converts its own error into this taxonomy, so callers
//! see the same variants whichever backend is configured.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid parameter: {0}")]
  InvalidParameter(&'static str),

  #[error("subject not found: {0}")]
  SubjectNotFound(String),

  #[error("secret not valid")]
  SecretNotValid,

  #[error("secret already assigned to another officer")]
  SecretInUse,

  #[error("store unavailable: {0}")]
  StoreUnavailable(String),

  #[error("forward failed: {0}")]
  ForwardFailed(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
