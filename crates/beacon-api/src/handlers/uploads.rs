//! Upload-token issue and trace upload.

use axum::{
  Json,
  extract::State,
  http::HeaderMap,
};
use beacon_core::{forward::Forwarder, store::TraceStore};
use serde::Deserialize;
use serde_json::{Value, json};

use super::success;
use crate::{AppState, auth::officer_secret, error::Error, service::UploadedTrace};

// ─── Token ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenBody {
  pub uid: String,
}

/// `POST /upload-tokens`. The officer is resolved from the secret header.
pub async fn issue_token<S, F>(
  State(state): State<AppState<S, F>>,
  headers: HeaderMap,
  Json(body): Json<TokenBody>,
) -> Result<Json<Value>, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  let secret = officer_secret(&headers)?;
  let token = state
    .service
    .issue_upload_token_for_secret(&body.uid, secret)
    .await?;
  Ok(success(json!({ "token": token })))
}

// ─── Upload ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadBody {
  pub uid:          String,
  #[serde(rename = "uploadToken")]
  pub upload_token: String,
  #[serde(default)]
  pub traces:       Vec<UploadedTrace>,
}

/// `POST /uploads`
pub async fn upload<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<UploadBody>,
) -> Result<Json<Value>, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  let saved = state
    .service
    .upload(&body.uid, &body.upload_token, body.traces)
    .await?;
  Ok(success(json!({ "count": saved.len() })))
}
