//! The `TraceStore` trait.
//!
//! The trait is implemented by storage backends ([`MemoryStore`] here and
//! `beacon-store-sqlite`). Higher layers depend on this abstraction, never on
//! a concrete backend; the backend is picked once at startup.
//!
//! [`MemoryStore`]: crate::memory::MemoryStore

use std::future::Future;

use crate::{
  Error,
  record::{ContactRecord, NewContactRecord},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Beacon trace store backend.
///
/// Registrations are insert-if-absent: registering an id that already exists
/// is a successful no-op and never overwrites. Contact records are
/// append-only and leave the store only through
/// [`purge_older_than`](Self::purge_older_than).
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait TraceStore: Send + Sync {
  /// Backend error. Converts into the shared [`Error`] taxonomy so callers can
  /// classify failures without knowing the backend.
  type Error: std::error::Error + Into<Error> + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Register a subject and its handshake PIN. Fails with
  /// [`Error::InvalidParameter`] if either is empty or `id` fails
  /// [`require_id`].
  fn register_subject<'a>(
    &'a self,
    id: &'a str,
    pin: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The PIN registered for `id`, or [`Error::SubjectNotFound`].
  fn handshake_pin<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  // ── Officers ──────────────────────────────────────────────────────────

  /// Register an officer. Fails with [`Error::SecretInUse`] if a different
  /// officer already holds `secret`, and with [`Error::InvalidParameter`] if
  /// `officer_id` fails [`require_id`].
  fn register_officer<'a>(
    &'a self,
    officer_id: &'a str,
    secret: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Exact-match lookup of the officer holding `secret`, or
  /// [`Error::SecretNotValid`].
  fn resolve_officer<'a>(
    &'a self,
    secret: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Remove an officer and its secret. Deleting an unknown officer succeeds.
  fn delete_officer<'a>(
    &'a self,
    officer_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Contact records ───────────────────────────────────────────────────

  /// Stamp `subject_id` and `officer_id` onto every record and append the
  /// batch atomically: either every record is stored or none is.
  ///
  /// A backend that gives up on a slow write with
  /// [`Error::StoreUnavailable`] does not cancel it, so the batch may still
  /// commit afterwards. Retrying after that error can store the batch twice.
  fn save_contact_records<'a>(
    &'a self,
    subject_id: &'a str,
    officer_id: &'a str,
    records: Vec<NewContactRecord>,
  ) -> impl Future<Output = Result<Vec<ContactRecord>, Self::Error>> + Send + 'a;

  /// Remove every record with `timestamp < cutoff`; returns how many were
  /// removed. Records saved concurrently with a later timestamp survive.
  fn purge_older_than(
    &self,
    cutoff: i64,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// All records uploaded by `subject_id`, in no particular order.
  fn contact_records<'a>(
    &'a self,
    subject_id: &'a str,
  ) -> impl Future<Output = Result<Vec<ContactRecord>, Self::Error>> + Send + 'a;
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Reject an empty required field. Shared by every backend so the contract
/// stays identical.
pub fn require(value: &str, name: &'static str) -> Result<(), Error> {
  if value.is_empty() {
    return Err(Error::InvalidParameter(name));
  }
  Ok(())
}

/// Longest subject or officer id accepted, in bytes. Both ids are sealed
/// together into an upload token whose ciphertext must fit a one-byte frame.
pub const MAX_ID_LEN: usize = 64;

/// Reject a subject or officer id that is empty, longer than [`MAX_ID_LEN`],
/// or that would need escaping inside a JSON string.
pub fn require_id(value: &str, name: &'static str) -> Result<(), Error> {
  require(value, name)?;
  let escaped = |c: char| c == '"' || c == '\\' || c.is_control();
  if value.len() > MAX_ID_LEN || value.chars().any(escaped) {
    return Err(Error::InvalidParameter(name));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_up_to_the_limit_are_accepted() {
    assert!(require_id(&"a".repeat(MAX_ID_LEN), "officer id").is_ok());
    assert!(matches!(
      require_id(&"a".repeat(MAX_ID_LEN + 1), "officer id"),
      Err(Error::InvalidParameter("officer id"))
    ));
  }

  #[test]
  fn ids_needing_json_escapes_are_rejected() {
    for id in ["", "a\"b", "a\\b", "a\nb"] {
      assert!(require_id(id, "subject id").is_err(), "{id:?}");
    }
    assert!(require_id("ünïcode-ok", "subject id").is_ok());
  }
}
