//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Body text for every rejected token or identifier. Clients never learn
/// which check failed.
pub const REJECTED: &str = "token rejected";

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] beacon_core::Error),

  #[error(transparent)]
  Crypto(#[from] beacon_crypto::Error),

  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Lift a backend error into the shared store taxonomy.
  pub fn store<E: Into<beacon_core::Error>>(err: E) -> Self {
    Self::Core(err.into())
  }

  fn status_and_message(&self) -> (StatusCode, String) {
    use beacon_core::Error as Core;
    use beacon_crypto::Error as Crypto;

    match self {
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".into()),
      Error::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),

      Error::Core(e) => match e {
        Core::InvalidParameter(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        Core::SecretNotValid => (StatusCode::UNAUTHORIZED, "unauthorized".into()),
        Core::SubjectNotFound(_) => (StatusCode::NOT_FOUND, "subject not found".into()),
        Core::SecretInUse => (StatusCode::CONFLICT, e.to_string()),
        Core::StoreUnavailable(_) => {
          (StatusCode::SERVICE_UNAVAILABLE, "store unavailable".into())
        }
        Core::ForwardFailed(_) => (StatusCode::BAD_GATEWAY, "forward failed".into()),
      },

      Error::Crypto(e) if e.is_rejection() => (StatusCode::UNAUTHORIZED, REJECTED.into()),
      Error::Crypto(e @ Crypto::InvalidSubjectLength { .. }) => {
        (StatusCode::BAD_REQUEST, e.to_string())
      }
      Error::Crypto(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into()),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = self.status_and_message();
    if status.is_server_error() {
      tracing::error!(error = %self, %status, "request failed");
    } else {
      tracing::debug!(error = %self, %status, "request rejected");
    }

    let mut res = (status, Json(json!({ "status": "FAIL", "error": message })))
      .into_response();
    if matches!(self, Error::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"beacon\""),
      );
    }
    res
  }
}
