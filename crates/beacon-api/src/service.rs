//! [`TraceService`]: the operations the HTTP layer exposes, over any
//! [`TraceStore`] and [`Forwarder`].
//!
//! The service owns the crypto engines and the shared key. It holds no
//! mutable state of its own; everything persistent goes through the store.

use std::{num::NonZeroU32, sync::Arc};

use beacon_core::{
  forward::Forwarder,
  record::{ContactRecord, NewContactRecord},
  store::{TraceStore, require, require_id},
};
use beacon_crypto::{
  DecodedIdentifier, IdentifierEngine, RotatingIdentifier, SymmetricKey, UploadToken,
  UploadTokenEngine,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Tunables for [`TraceService`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
  pub identifier_window_hours:  NonZeroU32,
  pub identifier_count:         u32,
  pub upload_token_valid_hours: NonZeroU32,
  pub refresh_interval_hours:   u32,
}

impl Default for ServiceSettings {
  fn default() -> Self {
    Self {
      identifier_window_hours:  NonZeroU32::MIN,
      identifier_count:         100,
      upload_token_valid_hours: NonZeroU32::MIN,
      refresh_interval_hours:   24,
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// One observation as uploaded by a device. `identifier` is the rotating
/// identifier the device heard; it is decoded to the contact's subject id
/// before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedTrace {
  #[serde(rename = "msg")]
  pub identifier:              String,
  pub timestamp:               i64,
  #[serde(rename = "modelC")]
  pub device_model_central:    String,
  #[serde(rename = "modelP")]
  pub device_model_peripheral: String,
  #[serde(rename = "rssi")]
  pub signal_strength:         i32,
  #[serde(rename = "txPower")]
  pub tx_power:                i32,
  pub org:                     String,
}

/// A freshly generated batch of identifiers and when the device should ask
/// for the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierBatch {
  pub identifiers:  Vec<RotatingIdentifier>,
  /// Epoch seconds.
  pub refresh_time: i64,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct TraceService<S, F> {
  store:         Arc<S>,
  forwarder:     Arc<F>,
  identifiers:   IdentifierEngine,
  upload_tokens: UploadTokenEngine,
  settings:      ServiceSettings,
}

impl<S, F> Clone for TraceService<S, F> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      forwarder:     Arc::clone(&self.forwarder),
      identifiers:   self.identifiers.clone(),
      upload_tokens: self.upload_tokens.clone(),
      settings:      self.settings,
    }
  }
}

impl<S, F> TraceService<S, F>
where
  S: TraceStore,
  F: Forwarder,
{
  pub fn new(
    store: Arc<S>,
    forwarder: Arc<F>,
    key: Arc<SymmetricKey>,
    settings: ServiceSettings,
  ) -> Self {
    Self {
      identifiers: IdentifierEngine::new(Arc::clone(&key), settings.identifier_window_hours),
      upload_tokens: UploadTokenEngine::new(key, settings.upload_token_valid_hours),
      store,
      forwarder,
      settings,
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn settings(&self) -> &ServiceSettings { &self.settings }

  // ── Subjects ──────────────────────────────────────────────────────────────

  pub async fn register_subject(&self, id: &str, pin: &str) -> Result<()> {
    self.store.register_subject(id, pin).await.map_err(Error::store)?;
    tracing::info!(subject_id = id, "subject registered");
    Ok(())
  }

  pub async fn handshake_pin(&self, id: &str) -> Result<String> {
    self.store.handshake_pin(id).await.map_err(Error::store)
  }

  // ── Officers ──────────────────────────────────────────────────────────────

  pub async fn register_officer(&self, officer_id: &str, secret: &str) -> Result<()> {
    self
      .store
      .register_officer(officer_id, secret)
      .await
      .map_err(Error::store)?;
    tracing::info!(officer_id, "officer registered");
    Ok(())
  }

  pub async fn delete_officer(&self, officer_id: &str) -> Result<()> {
    self.store.delete_officer(officer_id).await.map_err(Error::store)?;
    tracing::info!(officer_id, "officer deleted");
    Ok(())
  }

  pub async fn resolve_officer(&self, secret: &str) -> Result<String> {
    self.store.resolve_officer(secret).await.map_err(Error::store)
  }

  // ── Identifiers ───────────────────────────────────────────────────────────

  /// The configured number of consecutive identifiers for `subject_id`.
  pub fn generate_identifiers(&self, subject_id: &str) -> Result<IdentifierBatch> {
    let identifiers = self
      .identifiers
      .generate(subject_id, self.settings.identifier_count)?;
    let refresh_time =
      Utc::now().timestamp() + i64::from(self.settings.refresh_interval_hours) * 3600;
    tracing::debug!(subject_id, count = identifiers.len(), "identifiers generated");
    Ok(IdentifierBatch { identifiers, refresh_time })
  }

  pub fn decode_identifier(&self, token: &str) -> Result<DecodedIdentifier> {
    Ok(self.identifiers.decode(token)?)
  }

  // ── Upload tokens ─────────────────────────────────────────────────────────

  /// Both ids must pass [`require_id`], which keeps the sealed payload within
  /// one frame.
  pub fn issue_upload_token(&self, subject_id: &str, officer_id: &str) -> Result<String> {
    require_id(subject_id, "subject id")?;
    require_id(officer_id, "officer id")?;
    let (token, sealed) = self.upload_tokens.issue(subject_id, officer_id)?;
    tracing::info!(
      subject_id,
      officer_id,
      valid_until = token.valid_until,
      "upload token issued"
    );
    Ok(sealed)
  }

  /// Resolve the officer holding `secret`, then issue a token on their behalf.
  pub async fn issue_upload_token_for_secret(
    &self,
    subject_id: &str,
    secret: &str,
  ) -> Result<String> {
    require_id(subject_id, "subject id")?;
    let officer_id = self.resolve_officer(secret).await?;
    self.issue_upload_token(subject_id, &officer_id)
  }

  pub fn validate_upload_token(&self, token: &str) -> Result<UploadToken> {
    Ok(self.upload_tokens.validate(token)?)
  }

  // ── Uploads ───────────────────────────────────────────────────────────────

  /// Accept a device's trace batch.
  ///
  /// Every identifier is decoded before anything is written, so one bad
  /// trace rejects the whole batch. A forward failure is returned after the
  /// records are already stored.
  pub async fn upload(
    &self,
    subject_id: &str,
    upload_token: &str,
    traces: Vec<UploadedTrace>,
  ) -> Result<Vec<ContactRecord>> {
    require(subject_id, "subject id")?;
    let token = self.validate_upload_token(upload_token)?;
    if token.subject_id != subject_id {
      tracing::debug!(subject_id, "upload token issued for another subject");
      return Err(beacon_core::Error::InvalidParameter("subject id").into());
    }

    let records = traces
      .into_iter()
      .map(|trace| self.decode_trace(trace))
      .collect::<Result<Vec<_>>>()?;

    let saved = self
      .store
      .save_contact_records(subject_id, &token.officer_id, records)
      .await
      .map_err(Error::store)?;
    tracing::info!(subject_id, count = saved.len(), "traces uploaded");

    if let Err(e) = self.forwarder.forward(subject_id, &saved).await {
      tracing::warn!(subject_id, error = %e, "forwarding uploaded traces failed");
      return Err(e.into());
    }
    Ok(saved)
  }

  fn decode_trace(&self, trace: UploadedTrace) -> Result<NewContactRecord> {
    let decoded = self.identifiers.decode(&trace.identifier)?;
    // Observations outside the identifier's window are accepted.
    if !decoded.window_contains(trace.timestamp) {
      tracing::debug!(
        timestamp = trace.timestamp,
        start = decoded.start_time,
        expiry = decoded.expiry_time,
        "observation outside identifier window"
      );
    }
    Ok(NewContactRecord {
      contact_subject_id:      decoded.subject_id,
      timestamp:               trace.timestamp,
      device_model_central:    trace.device_model_central,
      device_model_peripheral: trace.device_model_peripheral,
      signal_strength:         trace.signal_strength,
      tx_power:                trace.tx_power,
      org:                     trace.org,
    })
  }

  // ── Contact records ───────────────────────────────────────────────────────

  pub async fn save_contact_records(
    &self,
    subject_id: &str,
    officer_id: &str,
    records: Vec<NewContactRecord>,
  ) -> Result<Vec<ContactRecord>> {
    self
      .store
      .save_contact_records(subject_id, officer_id, records)
      .await
      .map_err(Error::store)
  }

  pub async fn contact_records(&self, subject_id: &str) -> Result<Vec<ContactRecord>> {
    self.store.contact_records(subject_id).await.map_err(Error::store)
  }

  pub async fn purge_older_than(&self, cutoff: i64) -> Result<u64> {
    let removed = self.store.purge_older_than(cutoff).await.map_err(Error::store)?;
    tracing::info!(cutoff, removed, "purged contact records");
    Ok(removed)
  }

  /// Purge every record observed more than `age_hours` ago.
  pub async fn purge_older_than_hours(&self, age_hours: u32) -> Result<u64> {
    let cutoff = Utc::now().timestamp() - i64::from(age_hours) * 3600;
    self.purge_older_than(cutoff).await
  }
}
