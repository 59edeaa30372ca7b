//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | `POST` | `/subjects` | officer secret. Body: `{"uid":"…","pin":"…"}` |
//! | `GET`  | `/subjects/{id}/pin` | none |
//! | `GET`  | `/subjects/{id}/identifiers` | none |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use beacon_core::{forward::Forwarder, store::TraceStore};
use serde::Deserialize;
use serde_json::{Value, json};

use super::success;
use crate::{AppState, auth::Officer, error::Error};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub uid: String,
  pub pin: String,
}

/// `POST /subjects`
pub async fn register<S, F>(
  State(state): State<AppState<S, F>>,
  officer: Officer,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  tracing::debug!(officer_id = %officer.officer_id, subject_id = %body.uid, "registering subject");
  state.service.register_subject(&body.uid, &body.pin).await?;
  Ok((StatusCode::CREATED, success(json!({ "uid": body.uid }))))
}

// ─── Handshake PIN ───────────────────────────────────────────────────────────

/// `GET /subjects/{id}/pin`
pub async fn pin<S, F>(
  State(state): State<AppState<S, F>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  let pin = state.service.handshake_pin(&id).await?;
  Ok(success(json!({ "pin": pin })))
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// `GET /subjects/{id}/identifiers`
pub async fn identifiers<S, F>(
  State(state): State<AppState<S, F>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  let batch = state.service.generate_identifiers(&id)?;
  Ok(success(json!({
    "identifiers":  batch.identifiers,
    "refresh_time": batch.refresh_time,
  })))
}
