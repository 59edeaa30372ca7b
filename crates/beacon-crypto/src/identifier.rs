//! Rotating identifiers: the pseudonyms a device broadcasts to its neighbours.
//!
//! Each identifier seals a fixed-width payload:
//!
//! ```text
//! [subject id: 21 bytes] [start: u32 BE] [expiry: u32 BE]
//! ```
//!
//! Identifiers are never stored. The backend recovers the subject and window
//! by opening the token with the process key.

use std::{num::NonZeroU32, sync::Arc};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  cipher::{self, SymmetricKey},
};

/// Width of a subject id in bytes. Decoding splits the payload at this
/// offset, so no other width can round-trip.
pub const SUBJECT_ID_LEN: usize = 21;
const TIME_LEN: usize = 4;
/// Width of the sealed identifier payload.
pub const PAYLOAD_LEN: usize = SUBJECT_ID_LEN + 2 * TIME_LEN;
/// Each window opens this many seconds early to absorb clock skew between
/// devices.
pub const PRE_ROLL_SECS: u32 = 60;

/// An identifier as handed to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotatingIdentifier {
  pub ciphertext:  String,
  pub start_time:  u32,
  pub expiry_time: u32,
}

/// The content of an identifier recovered by [`IdentifierEngine::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedIdentifier {
  pub subject_id:  String,
  pub start_time:  u32,
  pub expiry_time: u32,
}

impl DecodedIdentifier {
  /// Whether `timestamp` falls inside `[start_time, expiry_time)`.
  ///
  /// Informational only: neither decoding nor uploads reject identifiers
  /// observed outside their window.
  pub fn window_contains(&self, timestamp: i64) -> bool {
    i64::from(self.start_time) <= timestamp
      && timestamp < i64::from(self.expiry_time)
  }
}

/// Generates and decodes rotating identifiers under a shared key.
#[derive(Debug, Clone)]
pub struct IdentifierEngine {
  key:          Arc<SymmetricKey>,
  window_hours: NonZeroU32,
}

impl IdentifierEngine {
  pub fn new(key: Arc<SymmetricKey>, window_hours: NonZeroU32) -> Self {
    Self { key, window_hours }
  }

  pub fn window_hours(&self) -> NonZeroU32 { self.window_hours }

  /// Generate `count` consecutive identifiers for `subject_id`, the first
  /// window starting now.
  pub fn generate(
    &self,
    subject_id: &str,
    count: u32,
  ) -> Result<Vec<RotatingIdentifier>> {
    let now =
      u32::try_from(Utc::now().timestamp()).map_err(|_| Error::ClockOutOfRange)?;
    self.generate_at(subject_id, count, now)
  }

  /// Generate `count` consecutive identifiers relative to `now`.
  pub fn generate_at(
    &self,
    subject_id: &str,
    count: u32,
    now: u32,
  ) -> Result<Vec<RotatingIdentifier>> {
    if subject_id.len() != SUBJECT_ID_LEN {
      return Err(Error::InvalidSubjectLength {
        expected: SUBJECT_ID_LEN,
        actual:   subject_id.len(),
      });
    }

    let window = self
      .window_hours
      .get()
      .checked_mul(3600)
      .ok_or(Error::ClockOutOfRange)?;

    (0..count)
      .map(|i| {
        let start = window
          .checked_mul(i)
          .and_then(|offset| now.checked_add(offset))
          .and_then(|t| t.checked_sub(PRE_ROLL_SECS))
          .ok_or(Error::ClockOutOfRange)?;
        let expiry = start.checked_add(window).ok_or(Error::ClockOutOfRange)?;
        self.seal(subject_id, start, expiry)
      })
      .collect()
  }

  fn seal(
    &self,
    subject_id: &str,
    start: u32,
    expiry: u32,
  ) -> Result<RotatingIdentifier> {
    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    payload.extend_from_slice(subject_id.as_bytes());
    payload.extend_from_slice(&start.to_be_bytes());
    payload.extend_from_slice(&expiry.to_be_bytes());

    Ok(RotatingIdentifier {
      ciphertext:  cipher::seal(&payload, &self.key)?,
      start_time:  start,
      expiry_time: expiry,
    })
  }

  /// Recover the subject id and window sealed into `token`.
  pub fn decode(&self, token: &str) -> Result<DecodedIdentifier> {
    let payload = cipher::open(token, &self.key)?;
    if payload.len() < PAYLOAD_LEN {
      return Err(Error::TruncatedPayload);
    }

    let (id, rest) = payload.split_at(SUBJECT_ID_LEN);
    let (start, rest) = rest.split_at(TIME_LEN);
    let (expiry, _) = rest.split_at(TIME_LEN);

    let subject_id =
      String::from_utf8(id.to_vec()).map_err(|_| Error::MalformedEncoding)?;

    Ok(DecodedIdentifier {
      subject_id,
      start_time: read_u32(start)?,
      expiry_time: read_u32(expiry)?,
    })
  }
}

fn read_u32(bytes: &[u8]) -> Result<u32> {
  let bytes: [u8; TIME_LEN] =
    bytes.try_into().map_err(|_| Error::TruncatedPayload)?;
  Ok(u32::from_be_bytes(bytes))
}
