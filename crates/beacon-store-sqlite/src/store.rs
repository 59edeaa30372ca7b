//! [`SqliteStore`]: the SQLite implementation of [`TraceStore`].

use std::{path::Path, time::Duration};

use rusqlite::OptionalExtension as _;

use beacon_core::{
  record::{ContactRecord, NewContactRecord},
  store::{TraceStore, require, require_id},
};

use crate::{Error, Result, schema::SCHEMA};

/// Deadline applied to each store call unless overridden with
/// [`SqliteStore::with_timeout`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const RECORD_COLUMNS: &str = "officer_id, subject_id, contact_subject_id, timestamp,
   device_model_central, device_model_peripheral, signal_strength, tx_power, org";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Beacon trace store backed by a single SQLite file.
///
/// Cloning is cheap; clones share one connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  timeout:         Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, timeout: DEFAULT_TIMEOUT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, timeout: DEFAULT_TIMEOUT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the per-call deadline.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `function` on the connection thread, giving up after the deadline.
  ///
  /// Giving up only stops the wait. A closure already queued still runs, so a
  /// write that reported [`Error::Timeout`] may commit later.
  async fn call<F, R>(&self, function: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> std::result::Result<R, tokio_rusqlite::Error>
      + Send
      + 'static,
    R: Send + 'static,
  {
    match tokio::time::timeout(self.timeout, self.conn.call(function)).await {
      Ok(result) => result.map_err(|e| {
        tracing::error!(error = %e, "sqlite call failed");
        Error::Database(e)
      }),
      Err(_) => {
        tracing::error!(timeout = ?self.timeout, "sqlite call timed out");
        Err(Error::Timeout(self.timeout))
      }
    }
  }
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContactRecord> {
  Ok(ContactRecord {
    officer_id:              row.get(0)?,
    subject_id:              row.get(1)?,
    contact_subject_id:      row.get(2)?,
    timestamp:               row.get(3)?,
    device_model_central:    row.get(4)?,
    device_model_peripheral: row.get(5)?,
    signal_strength:         row.get(6)?,
    tx_power:                row.get(7)?,
    org:                     row.get(8)?,
  })
}

/// What `register_officer` found inside its transaction.
enum OfficerRegistration {
  Inserted,
  AlreadyRegistered,
  SecretInUse,
}

// ─── TraceStore impl ─────────────────────────────────────────────────────────

impl TraceStore for SqliteStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn register_subject(&self, id: &str, pin: &str) -> Result<()> {
    require_id(id, "subject id")?;
    require(pin, "pin")?;
    tracing::trace!(subject_id = id, "register_subject");

    let id = id.to_owned();
    let pin = pin.to_owned();

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (subject_id, pin) VALUES (?1, ?2)
           ON CONFLICT(subject_id) DO NOTHING",
          rusqlite::params![id, pin],
        )?;
        Ok(())
      })
      .await
  }

  async fn handshake_pin(&self, id: &str) -> Result<String> {
    require(id, "subject id")?;
    tracing::trace!(subject_id = id, "handshake_pin");

    let id_owned = id.to_owned();
    let pin: Option<String> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT pin FROM subjects WHERE subject_id = ?1",
              rusqlite::params![id_owned],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    pin.ok_or_else(|| beacon_core::Error::SubjectNotFound(id.to_owned()).into())
  }

  // ── Officers ──────────────────────────────────────────────────────────────

  async fn register_officer(&self, officer_id: &str, secret: &str) -> Result<()> {
    require_id(officer_id, "officer id")?;
    require(secret, "secret")?;
    tracing::trace!(officer_id, "register_officer");

    let officer_id = officer_id.to_owned();
    let secret = secret.to_owned();

    let outcome = self
      .call(move |conn| {
        let tx = conn.transaction()?;

        let registered = tx
          .query_row(
            "SELECT 1 FROM officers WHERE officer_id = ?1",
            rusqlite::params![officer_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if registered {
          return Ok(OfficerRegistration::AlreadyRegistered);
        }

        let holder: Option<String> = tx
          .query_row(
            "SELECT officer_id FROM officers WHERE secret = ?1",
            rusqlite::params![secret],
            |row| row.get(0),
          )
          .optional()?;
        if holder.is_some() {
          return Ok(OfficerRegistration::SecretInUse);
        }

        tx.execute(
          "INSERT INTO officers (officer_id, secret) VALUES (?1, ?2)",
          rusqlite::params![officer_id, secret],
        )?;
        tx.commit()?;
        Ok(OfficerRegistration::Inserted)
      })
      .await?;

    match outcome {
      OfficerRegistration::Inserted | OfficerRegistration::AlreadyRegistered => Ok(()),
      OfficerRegistration::SecretInUse => Err(beacon_core::Error::SecretInUse.into()),
    }
  }

  async fn resolve_officer(&self, secret: &str) -> Result<String> {
    require(secret, "secret")?;
    tracing::trace!("resolve_officer secret:****");

    let secret = secret.to_owned();
    let officer_id: Option<String> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT officer_id FROM officers WHERE secret = ?1",
              rusqlite::params![secret],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    officer_id.ok_or_else(|| beacon_core::Error::SecretNotValid.into())
  }

  async fn delete_officer(&self, officer_id: &str) -> Result<()> {
    require(officer_id, "officer id")?;
    tracing::trace!(officer_id, "delete_officer");

    let officer_id = officer_id.to_owned();
    self
      .call(move |conn| {
        conn.execute(
          "DELETE FROM officers WHERE officer_id = ?1",
          rusqlite::params![officer_id],
        )?;
        Ok(())
      })
      .await
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
    if stamped.is_empty() {
      return Ok(stamped);
    }

    let batch = stamped.clone();
    let inserted = self
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(&format!(
            "INSERT INTO contact_records ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
          ))?;
          for r in &batch {
            stmt.execute(rusqlite::params![
              r.officer_id,
              r.subject_id,
              r.contact_subject_id,
              r.timestamp,
              r.device_model_central,
              r.device_model_peripheral,
              r.signal_strength,
              r.tx_power,
              r.org,
            ])?;
          }
        }
        tx.commit()?;
        Ok(batch.len())
      })
      .await?;

    tracing::trace!(subject_id, inserted, "save_contact_records committed");
    Ok(stamped)
  }

  async fn purge_older_than(&self, cutoff: i64) -> Result<u64> {
    let removed = self
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM contact_records WHERE timestamp < ?1",
          rusqlite::params![cutoff],
        )?)
      })
      .await?;

    tracing::trace!(cutoff, removed, "purge_older_than");
    Ok(removed as u64)
  }

  async fn contact_records(&self, subject_id: &str) -> Result<Vec<ContactRecord>> {
    require(subject_id, "subject id")?;
    tracing::trace!(subject_id, "contact_records");

    let subject_id = subject_id.to_owned();
    self
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM contact_records WHERE subject_id = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![subject_id], read_record)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }
}
