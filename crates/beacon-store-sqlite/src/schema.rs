//! SQL schema for the Beacon SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    pin         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS officers (
    officer_id  TEXT PRIMARY KEY,
    secret      TEXT NOT NULL
);

-- The secret is the lookup key for officers and must identify exactly one.
CREATE UNIQUE INDEX IF NOT EXISTS officers_secret_idx ON officers(secret);

-- Append-only. Rows are removed only by the age-based purge.
CREATE TABLE IF NOT EXISTS contact_records (
    record_id               INTEGER PRIMARY KEY AUTOINCREMENT,
    officer_id              TEXT    NOT NULL,
    subject_id              TEXT    NOT NULL,
    contact_subject_id      TEXT    NOT NULL,
    timestamp               INTEGER NOT NULL,   -- epoch seconds
    device_model_central    TEXT    NOT NULL,
    device_model_peripheral TEXT    NOT NULL,
    signal_strength         INTEGER NOT NULL,
    tx_power                INTEGER NOT NULL,
    org                     TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS contact_records_subject_idx   ON contact_records(subject_id);
CREATE INDEX IF NOT EXISTS contact_records_timestamp_idx ON contact_records(timestamp);

PRAGMA user_version = 1;
";
