//! Cryptographic primitives for the Beacon tracing backend.
//!
//! Three layers, each built on the one before it:
//!
//! - [`cipher`]: AES-256-GCM sealing with a compact length-prefixed frame and
//!   base64 text encoding.
//! - [`identifier`]: time-windowed rotating identifiers broadcast by devices.
//! - [`upload_token`]: short-lived, officer-issued upload authorisations.
//!
//! Nothing here touches storage or I/O beyond the OS random number generator.

pub mod cipher;
pub mod error;
pub mod identifier;
pub mod upload_token;

pub use cipher::SymmetricKey;
pub use error::{Error, Result};
pub use identifier::{DecodedIdentifier, IdentifierEngine, RotatingIdentifier};
pub use upload_token::{UploadToken, UploadTokenEngine};
