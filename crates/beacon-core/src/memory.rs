//! [`MemoryStore`]: the volatile implementation of [`TraceStore`].
//!
//! All collections sit behind one lock, so the secret index can never drift
//! from the officer map and a purge can never interleave with half a batch.

use std::{
  collections::{HashMap, hash_map::Entry},
  sync::Arc,
};

use parking_lot::RwLock;

use crate::{
  Error, Result,
  record::{ContactRecord, NewContactRecord},
  store::{TraceStore, require, require_id},
};

#[derive(Debug, Default)]
struct State {
  /// subject id → pin
  subjects:           HashMap<String, String>,
  /// officer id → secret
  officers:           HashMap<String, String>,
  /// secret → officer id
  officers_by_secret: HashMap<String, String>,
  records:            Vec<ContactRecord>,
}

/// An in-process store. Contents are lost when the process exits.
///
/// Cloning is cheap and clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<RwLock<State>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl TraceStore for MemoryStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn register_subject(&self, id: &str, pin: &str) -> Result<()> {
    require_id(id, "subject id")?;
    require(pin, "pin")?;
    tracing::trace!(subject_id = id, "register_subject");

    let mut state = self.state.write();
    state
      .subjects
      .entry(id.to_owned())
      .or_insert_with(|| pin.to_owned());
    Ok(())
  }

  async fn handshake_pin(&self, id: &str) -> Result<String> {
    require(id, "subject id")?;
    tracing::trace!(subject_id = id, "handshake_pin");

    self
      .state
      .read()
      .subjects
      .get(id)
      .cloned()
      .ok_or_else(|| Error::SubjectNotFound(id.to_owned()))
  }

  // ── Officers ──────────────────────────────────────────────────────────────

  async fn register_officer(&self, officer_id: &str, secret: &str) -> Result<()> {
    require_id(officer_id, "officer id")?;
    require(secret, "secret")?;
    tracing::trace!(officer_id, "register_officer");

    let mut state = self.state.write();
    if state.officers.contains_key(officer_id) {
      return Ok(());
    }
    match state.officers_by_secret.entry(secret.to_owned()) {
      Entry::Occupied(_) => return Err(Error::SecretInUse),
      Entry::Vacant(slot) => {
        slot.insert(officer_id.to_owned());
      }
    }
    state.officers.insert(officer_id.to_owned(), secret.to_owned());
    Ok(())
  }

  async fn resolve_officer(&self, secret: &str) -> Result<String> {
    require(secret, "secret")?;
    tracing::trace!("resolve_officer secret:****");

    self
      .state
      .read()
      .officers_by_secret
      .get(secret)
      .cloned()
      .ok_or(Error::SecretNotValid)
  }

  async fn delete_officer(&self, officer_id: &str) -> Result<()> {
    require(officer_id, "officer id")?;
    tracing::trace!(officer_id, "delete_officer");

    let mut state = self.state.write();
    if let Some(secret) = state.officers.remove(officer_id) {
      state.officers_by_secret.remove(&secret);
    }
    Ok(())
  }

  // ── Contact records ───────────────────────────────────────────────────────

  async fn save_contact_records(
    &self,
    subject_id: &str,
    officer_id: &str,
    records: Vec<NewContactRecord>,
  ) -> Result<Vec<ContactRecord>> {
    require(subject_id, "subject id")?;
    require(officer_id, "officer id")?;
    tracing::trace!(subject_id, officer_id, count = records.len(), "save_contact_records");

    let stamped: Vec<ContactRecord> = records
      .into_iter()
      .map(|r| r.into_record(subject_id, officer_id))
      .collect();

    self.state.write().records.extend(stamped.iter().cloned());
    Ok(stamped)
  }

  async fn purge_older_than(&self, cutoff: i64) -> Result<u64> {
    let mut state = self.state.write();
    let before = state.records.len();
    state.records.retain(|r| r.timestamp >= cutoff);
    let removed = (before - state.records.len()) as u64;
    tracing::trace!(cutoff, removed, "purge_older_than");
    Ok(removed)
  }

  async fn contact_records(&self, subject_id: &str) -> Result<Vec<ContactRecord>> {
    require(subject_id, "subject id")?;
    tracing::trace!(subject_id, "contact_records");

    Ok(
      self
        .state
        .read()
        .records
        .iter()
        .filter(|r| r.subject_id == subject_id)
        .cloned()
        .collect(),
    )
  }
}
