//! Persistent domain records.

use serde::{Deserialize, Serialize};

/// A registered, tracked individual. `pin` is the handshake secret returned
/// to the owning device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:  String,
  pub pin: String,
}

/// A field officer. The secret doubles as the lookup key, so no two officers
/// may share one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
  pub officer_id: String,
  pub secret:     String,
}

/// One observed proximity event between two subjects.
///
/// Records are append-only; they leave the store only through an age-based
/// purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
  pub officer_id:              String,
  pub subject_id:              String,
  pub contact_subject_id:      String,
  /// Observation time, epoch seconds.
  pub timestamp:               i64,
  pub device_model_central:    String,
  pub device_model_peripheral: String,
  /// Received signal strength (RSSI).
  pub signal_strength:         i32,
  pub tx_power:                i32,
  pub org:                     String,
}

/// Input to [`TraceStore::save_contact_records`](crate::store::TraceStore::save_contact_records).
/// The store stamps the uploading subject and the authorising officer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContactRecord {
  pub contact_subject_id:      String,
  pub timestamp:               i64,
  pub device_model_central:    String,
  pub device_model_peripheral: String,
  pub signal_strength:         i32,
  pub tx_power:                i32,
  pub org:                     String,
}

impl NewContactRecord {
  pub fn into_record(self, subject_id: &str, officer_id: &str) -> ContactRecord {
    ContactRecord {
      officer_id:              officer_id.to_owned(),
      subject_id:              subject_id.to_owned(),
      contact_subject_id:      self.contact_subject_id,
      timestamp:               self.timestamp,
      device_model_central:    self.device_model_central,
      device_model_peripheral: self.device_model_peripheral,
      signal_strength:         self.signal_strength,
      tx_power:                self.tx_power,
      org:                     self.org,
    }
  }
}
