//! Request authentication.
//!
//! Two principals exist: the administrator, authenticated with HTTP Basic
//! against an argon2 hash, and officers, authenticated by presenting their
//! secret in the `x-officer-secret` header.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use beacon_core::{forward::Forwarder, store::TraceStore};

use crate::{AppState, error::Error};

/// Header carrying an officer's secret.
pub const OFFICER_SECRET_HEADER: &str = "x-officer-secret";

/// Administrator credentials for this server instance.
#[derive(Clone)]
pub struct AdminAuth {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Present in a handler means the request carried valid admin credentials.
pub struct Admin;

/// The officer whose secret authenticated the request.
pub struct Officer {
  pub officer_id: String,
}

/// Verify admin Basic credentials from headers.
pub fn verify_admin(headers: &HeaderMap, config: &AdminAuth) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

pub(crate) fn officer_secret(headers: &HeaderMap) -> Result<&str, Error> {
  headers
    .get(OFFICER_SECRET_HEADER)
    .and_then(|v| v.to_str().ok())
    .filter(|s| !s.is_empty())
    .ok_or(Error::Unauthorized)
}

impl<S, F> FromRequestParts<AppState<S, F>> for Admin
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, F>,
  ) -> Result<Self, Self::Rejection> {
    verify_admin(&parts.headers, &state.admin)?;
    Ok(Admin)
  }
}

impl<S, F> FromRequestParts<AppState<S, F>> for Officer
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, F>,
  ) -> Result<Self, Self::Rejection> {
    let secret = officer_secret(&parts.headers)?;
    let officer_id = state.service.resolve_officer(secret).await?;
    Ok(Officer { officer_id })
  }
}
