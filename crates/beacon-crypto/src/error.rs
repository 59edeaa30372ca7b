//! Error type for `beacon-crypto`.
//!
//! Display strings for rejected input carry no detail. Callers may
//! log them, but must not expose which check failed to an untrusted client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid key size {0}, expected 32 bytes")]
  InvalidKeyLength(usize),

  #[error("operating system random number generator failed")]
  Randomness,

  #[error("authentication failed")]
  AuthenticationFailed,

  #[error("malformed encoding")]
  MalformedEncoding,

  #[error("truncated input")]
  TruncatedInput,

  #[error("truncated payload")]
  TruncatedPayload,

  #[error("invalid subject id length {actual}, expected {expected}")]
  InvalidSubjectLength { expected: usize, actual: usize },

  #[error("sealed payload of {0} bytes does not fit in a single-byte frame")]
  PayloadTooLarge(usize),

  #[error("timestamp out of range for the identifier clock")]
  ClockOutOfRange,

  #[error("token expired")]
  TokenExpired,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// `true` for errors caused by untrusted input being rejected, as opposed to
  /// local faults (key material, randomness, clock).
  pub fn is_rejection(&self) -> bool {
    matches!(
      self,
      Self::AuthenticationFailed
        | Self::MalformedEncoding
        | Self::TruncatedInput
        | Self::TruncatedPayload
        | Self::TokenExpired
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
