//! Runtime configuration, deserialised from `config.toml` and `BEACON_*`
//! environment variables.

use std::{num::NonZeroU32, path::PathBuf, time::Duration};

use beacon_api::ServiceSettings;
use serde::Deserialize;

/// Which [`TraceStore`](beacon_core::store::TraceStore) backend to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
  #[default]
  Memory,
  Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedOfficer {
  pub officer_id: String,
  pub secret:     String,
}

#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                     String,
  #[serde(default = "default_port")]
  pub port:                     u16,
  #[serde(default)]
  pub store:                    StoreBackend,
  #[serde(default = "default_store_path")]
  pub store_path:               PathBuf,
  #[serde(default = "default_store_timeout_secs")]
  pub store_timeout_secs:       u64,
  /// Raw 32-byte AES-256 key.
  pub crypt_key:                String,
  #[serde(default = "one_hour")]
  pub identifier_window_hours:  NonZeroU32,
  #[serde(default = "default_identifier_count")]
  pub identifier_count:         u32,
  #[serde(default = "one_hour")]
  pub upload_token_valid_hours: NonZeroU32,
  #[serde(default = "default_refresh_interval_hours")]
  pub refresh_interval_hours:   u32,
  #[serde(default = "default_admin_username")]
  pub admin_username:           String,
  /// PHC string produced by `beacon --hash-password`.
  pub admin_password_hash:      String,
  #[serde(default)]
  pub seed_officers:            Vec<SeedOfficer>,
}

impl ServerConfig {
  pub fn service_settings(&self) -> ServiceSettings {
    ServiceSettings {
      identifier_window_hours:  self.identifier_window_hours,
      identifier_count:         self.identifier_count,
      upload_token_valid_hours: self.upload_token_valid_hours,
      refresh_interval_hours:   self.refresh_interval_hours,
    }
  }

  pub fn store_timeout(&self) -> Duration { Duration::from_secs(self.store_timeout_secs) }
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("beacon.db") }
fn default_store_timeout_secs() -> u64 { 5 }
fn one_hour() -> NonZeroU32 { NonZeroU32::MIN }
fn default_identifier_count() -> u32 { 100 }
fn default_refresh_interval_hours() -> u32 { 24 }
fn default_admin_username() -> String { "admin".to_owned() }
