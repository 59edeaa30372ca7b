//! Authenticated symmetric encryption and the compact token frame.
//!
//! A sealed token is `base64(frame(ciphertext, nonce))` where the frame is:
//!
//! ```text
//! [len(ciphertext): u8] [ciphertext] [len(nonce): u8] [nonce]
//! ```
//!
//! The ciphertext carries the 16-byte GCM tag at its end. Because the length
//! prefixes are a single byte, [`frame`] can only describe buffers of up to
//! 255 bytes; [`seal`] refuses anything larger.

use std::fmt;

use aes_gcm::{
  Aes256Gcm, Nonce,
  aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::{OsRng, RngCore as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// Key size for AES-256-GCM.
pub const KEY_LEN: usize = 32;
/// Nonce size; a fresh random nonce is drawn for every encryption.
pub const NONCE_LEN: usize = 12;
/// Authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;
/// Largest value a single length byte can express.
pub const MAX_FRAMED_LEN: usize = u8::MAX as usize;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Process-wide symmetric key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
  /// Build a key from raw bytes; anything but exactly 32 bytes is rejected.
  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    let key: [u8; KEY_LEN] = bytes
      .try_into()
      .map_err(|_| Error::InvalidKeyLength(bytes.len()))?;
    Ok(Self(key))
  }

  fn cipher(&self) -> Aes256Gcm { Aes256Gcm::new(&self.0.into()) }
}

impl fmt::Debug for SymmetricKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SymmetricKey(<redacted>)")
  }
}

// ─── AEAD ────────────────────────────────────────────────────────────────────

/// Encrypt `plaintext` under a freshly generated nonce.
///
/// A failing OS random number generator aborts the operation; the nonce is
/// never defaulted.
pub fn encrypt(
  plaintext: &[u8],
  key: &SymmetricKey,
) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
  let mut nonce = [0u8; NONCE_LEN];
  OsRng
    .try_fill_bytes(&mut nonce)
    .map_err(|_| Error::Randomness)?;

  let ciphertext = key
    .cipher()
    .encrypt(Nonce::from_slice(&nonce), plaintext)
    .map_err(|_| Error::AuthenticationFailed)?;

  Ok((ciphertext, nonce))
}

/// Decrypt and authenticate. Wrong key, wrong nonce, a nonce of the wrong
/// size and corrupted data are all reported as
/// [`Error::AuthenticationFailed`].
pub fn decrypt(
  ciphertext: &[u8],
  nonce: &[u8],
  key: &SymmetricKey,
) -> Result<Vec<u8>> {
  if nonce.len() != NONCE_LEN {
    return Err(Error::AuthenticationFailed);
  }
  key
    .cipher()
    .decrypt(Nonce::from_slice(nonce), ciphertext)
    .map_err(|_| Error::AuthenticationFailed)
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// Length-prefix and concatenate `ciphertext` and `nonce`.
///
/// Lengths above 255 wrap silently in the prefix byte. Callers must keep both
/// parts within [`MAX_FRAMED_LEN`].
pub fn frame(ciphertext: &[u8], nonce: &[u8]) -> Vec<u8> {
  let mut framed = Vec::with_capacity(2 + ciphertext.len() + nonce.len());
  framed.push(ciphertext.len() as u8);
  framed.extend_from_slice(ciphertext);
  framed.push(nonce.len() as u8);
  framed.extend_from_slice(nonce);
  framed
}

/// Split a frame back into `(ciphertext, nonce)`. Bytes after the nonce are
/// ignored.
pub fn unframe(framed: &[u8]) -> Result<(&[u8], &[u8])> {
  let (ciphertext, rest) = take_prefixed(framed)?;
  let (nonce, _) = take_prefixed(rest)?;
  Ok((ciphertext, nonce))
}

fn take_prefixed(buf: &[u8]) -> Result<(&[u8], &[u8])> {
  let (&len, rest) = buf.split_first().ok_or(Error::TruncatedInput)?;
  let len = usize::from(len);
  if rest.len() < len {
    return Err(Error::TruncatedInput);
  }
  Ok(rest.split_at(len))
}

// ─── Text ────────────────────────────────────────────────────────────────────

pub fn encode_text(framed: &[u8]) -> String { B64.encode(framed) }

pub fn decode_text(text: &str) -> Result<Vec<u8>> {
  B64.decode(text).map_err(|_| Error::MalformedEncoding)
}

// ─── Composite ───────────────────────────────────────────────────────────────

/// Encrypt, frame and text-encode `plaintext`.
pub fn seal(plaintext: &[u8], key: &SymmetricKey) -> Result<String> {
  let (ciphertext, nonce) = encrypt(plaintext, key)?;
  if ciphertext.len() > MAX_FRAMED_LEN {
    return Err(Error::PayloadTooLarge(ciphertext.len()));
  }
  Ok(encode_text(&frame(&ciphertext, &nonce)))
}

/// Inverse of [`seal`]. Once the text decodes, every failure, including a
/// corrupted length prefix, is [`Error::AuthenticationFailed`].
pub fn open(token: &str, key: &SymmetricKey) -> Result<Vec<u8>> {
  let framed = decode_text(token)?;
  let (ciphertext, nonce) =
    unframe(&framed).map_err(|_| Error::AuthenticationFailed)?;
  decrypt(ciphertext, nonce, key)
}
