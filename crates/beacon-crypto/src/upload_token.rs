//! Upload tokens: an officer's authorisation for one subject's device to
//! submit contact data during a bounded window.
//!
//! Tokens are stateless. The payload is JSON (`oid`, `uid`, `nbf`, `exp`)
//! sealed with the process key; validity depends only on the embedded
//! timestamps and the key.

use std::{num::NonZeroU32, sync::Arc};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  cipher::{self, SymmetricKey},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadToken {
  #[serde(rename = "oid")]
  pub officer_id:  String,
  #[serde(rename = "uid")]
  pub subject_id:  String,
  #[serde(rename = "nbf")]
  pub valid_from:  i64,
  #[serde(rename = "exp")]
  pub valid_until: i64,
}

impl UploadToken {
  /// Valid strictly between `valid_from` and `valid_until`. A token presented
  /// at exactly `valid_from` is not yet valid.
  pub fn is_valid_at(&self, now: i64) -> bool {
    self.valid_from < now && now < self.valid_until
  }

  pub fn is_currently_valid(&self) -> bool {
    self.is_valid_at(Utc::now().timestamp())
  }
}

/// Issues, parses and validates upload tokens under a shared key.
#[derive(Debug, Clone)]
pub struct UploadTokenEngine {
  key:         Arc<SymmetricKey>,
  valid_hours: NonZeroU32,
}

impl UploadTokenEngine {
  pub fn new(key: Arc<SymmetricKey>, valid_hours: NonZeroU32) -> Self {
    Self { key, valid_hours }
  }

  /// Issue a token valid from now for the configured number of hours.
  pub fn issue(
    &self,
    subject_id: &str,
    officer_id: &str,
  ) -> Result<(UploadToken, String)> {
    self.issue_at(subject_id, officer_id, Utc::now().timestamp())
  }

  pub fn issue_at(
    &self,
    subject_id: &str,
    officer_id: &str,
    now: i64,
  ) -> Result<(UploadToken, String)> {
    let lifetime = i64::from(self.valid_hours.get()) * 3600;
    let token = UploadToken {
      officer_id:  officer_id.to_owned(),
      subject_id:  subject_id.to_owned(),
      valid_from:  now,
      valid_until: now.checked_add(lifetime).ok_or(Error::ClockOutOfRange)?,
    };
    let payload = serde_json::to_vec(&token)?;
    let sealed = cipher::seal(&payload, &self.key)?;
    Ok((token, sealed))
  }

  /// Open and deserialise a token without checking its validity window.
  pub fn parse(&self, token: &str) -> Result<UploadToken> {
    let payload = cipher::open(token, &self.key)?;
    serde_json::from_slice(&payload).map_err(|_| Error::MalformedEncoding)
  }

  /// Parse a token and require it to be valid now.
  pub fn validate(&self, token: &str) -> Result<UploadToken> {
    self.validate_at(token, Utc::now().timestamp())
  }

  pub fn validate_at(&self, token: &str, now: i64) -> Result<UploadToken> {
    let parsed = self.parse(token)?;
    if !parsed.is_valid_at(now) {
      return Err(Error::TokenExpired);
    }
    Ok(parsed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const NOW: i64 = 1_700_000_000;

  fn engine() -> UploadTokenEngine {
    let key = SymmetricKey::from_bytes(&[42u8; 32]).unwrap();
    UploadTokenEngine::new(Arc::new(key), NonZeroU32::MIN)
  }

  #[test]
  fn issue_then_parse() {
    let engine = engine();
    let (issued, sealed) = engine.issue_at("123456789012345678901", "off1", NOW).unwrap();
    assert_eq!(issued.valid_from, NOW);
    assert_eq!(issued.valid_until, NOW + 3600);

    let parsed = engine.parse(&sealed).unwrap();
    assert_eq!(parsed, issued);
  }

  #[test]
  fn payload_uses_short_field_tags() {
    let token = UploadToken {
      officer_id:  "o".into(),
      subject_id:  "u".into(),
      valid_from:  1,
      valid_until: 2,
    };
    let json = serde_json::to_value(&token).unwrap();
    assert_eq!(json, serde_json::json!({ "oid": "o", "uid": "u", "nbf": 1, "exp": 2 }));
  }

  #[test]
  fn validity_is_strict_on_both_boundaries() {
    let (token, _) = engine().issue_at("s", "o", NOW).unwrap();
    assert!(!token.is_valid_at(NOW - 1));
    assert!(!token.is_valid_at(NOW));
    assert!(token.is_valid_at(NOW + 1));
    assert!(token.is_valid_at(NOW + 1800));
    assert!(token.is_valid_at(NOW + 3599));
    assert!(!token.is_valid_at(NOW + 3600));
    assert!(!token.is_valid_at(NOW + 3601));
  }

  #[test]
  fn every_interior_instant_is_valid() {
    let (token, _) = engine().issue_at("s", "o", NOW).unwrap();
    assert!((NOW + 1..NOW + 3600).all(|t| token.is_valid_at(t)));
  }

  #[test]
  fn freshly_issued_token_becomes_valid_after_a_second() {
    let (token, _) = engine().issue("s", "o").unwrap();
    assert!(token.is_valid_at(token.valid_from + 1));
  }

  #[test]
  fn validate_rejects_expired_and_premature_tokens() {
    let engine = engine();
    let (_, sealed) = engine.issue_at("s", "o", NOW).unwrap();
    assert!(engine.validate_at(&sealed, NOW + 10).is_ok());
    assert!(matches!(engine.validate_at(&sealed, NOW), Err(Error::TokenExpired)));
    assert!(matches!(
      engine.validate_at(&sealed, NOW + 7200),
      Err(Error::TokenExpired)
    ));
  }

  #[test]
  fn authenticated_non_json_is_malformed() {
    let engine = engine();
    let sealed = cipher::seal(b"not json", &engine.key).unwrap();
    assert!(matches!(engine.parse(&sealed), Err(Error::MalformedEncoding)));
  }

  #[test]
  fn foreign_key_is_authentication_failure() {
    let (_, sealed) = engine().issue_at("s", "o", NOW).unwrap();
    let other = UploadTokenEngine::new(
      Arc::new(SymmetricKey::from_bytes(&[7u8; 32]).unwrap()),
      NonZeroU32::MIN,
    );
    assert!(matches!(other.parse(&sealed), Err(Error::AuthenticationFailed)));
  }
}
