//! Forwarders relay accepted trace batches out of band.
//!
//! A forwarder runs after the batch is durably stored. A failure is reported
//! as [`Error::ForwardFailed`] but never undoes the write.

use std::future::Future;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{Error, Result, record::ContactRecord};

pub trait Forwarder: Send + Sync {
  fn forward<'a>(
    &'a self,
    subject_id: &'a str,
    records: &'a [ContactRecord],
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

// ─── Log ─────────────────────────────────────────────────────────────────────

/// Writes every batch to the `beacon::forward` tracing target as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogForwarder;

impl Forwarder for LogForwarder {
  async fn forward(&self, subject_id: &str, records: &[ContactRecord]) -> Result<()> {
    let body = serde_json::to_string(records)
      .map_err(|e| Error::ForwardFailed(e.to_string()))?;
    tracing::info!(
      target: "beacon::forward",
      subject_id,
      count = records.len(),
      %body,
      "forwarding trace batch"
    );
    Ok(())
  }
}

// ─── Queue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedBatch {
  pub subject_id: String,
  pub records:    Vec<ContactRecord>,
}

/// Pushes batches onto a bounded channel for a downstream consumer. A full or
/// closed channel fails the forward rather than blocking the upload.
#[derive(Debug, Clone)]
pub struct QueueForwarder {
  tx: mpsc::Sender<ForwardedBatch>,
}

impl QueueForwarder {
  pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ForwardedBatch>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Self { tx }, rx)
  }
}

impl Forwarder for QueueForwarder {
  async fn forward(&self, subject_id: &str, records: &[ContactRecord]) -> Result<()> {
    let batch = ForwardedBatch {
      subject_id: subject_id.to_owned(),
      records:    records.to_vec(),
    };
    self.tx.try_send(batch).map_err(|e| match e {
      TrySendError::Full(_) => Error::ForwardFailed("forward queue is full".into()),
      TrySendError::Closed(_) => Error::ForwardFailed("forward queue is closed".into()),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record() -> ContactRecord {
    ContactRecord {
      officer_id:              "off1".into(),
      subject_id:              "s".into(),
      contact_subject_id:      "c".into(),
      timestamp:               1,
      device_model_central:    "a".into(),
      device_model_peripheral: "b".into(),
      signal_strength:         -70,
      tx_power:                7,
      org:                     "org".into(),
    }
  }

  #[tokio::test]
  async fn log_forwarder_accepts_batches() {
    LogForwarder.forward("s", &[record()]).await.unwrap();
    LogForwarder.forward("s", &[]).await.unwrap();
  }

  #[tokio::test]
  async fn queue_forwarder_delivers_batches() {
    let (forwarder, mut rx) = QueueForwarder::channel(4);
    forwarder.forward("s", &[record()]).await.unwrap();

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.subject_id, "s");
    assert_eq!(batch.records, vec![record()]);
  }

  #[tokio::test]
  async fn full_queue_fails() {
    let (forwarder, _rx) = QueueForwarder::channel(1);
    forwarder.forward("s", &[record()]).await.unwrap();
    assert!(matches!(
      forwarder.forward("s", &[record()]).await,
      Err(Error::ForwardFailed(_))
    ));
  }

  #[tokio::test]
  async fn closed_queue_fails() {
    let (forwarder, rx) = QueueForwarder::channel(1);
    drop(rx);
    assert!(matches!(
      forwarder.forward("s", &[record()]).await,
      Err(Error::ForwardFailed(_))
    ));
  }
}
