//! Contact record inspection and retention. Admin only.

use axum::{
  Json,
  extract::{Path, State},
};
use beacon_core::{forward::Forwarder, store::TraceStore};
use serde::Deserialize;
use serde_json::{Value, json};

use super::success;
use crate::{AppState, auth::Admin, error::Error};

/// `GET /subjects/{id}/contacts`
pub async fn contacts<S, F>(
  State(state): State<AppState<S, F>>,
  _admin: Admin,
  Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  let records = state.service.contact_records(&id).await?;
  Ok(success(json!({ "trace": records })))
}

#[derive(Debug, Deserialize)]
pub struct PurgeBody {
  pub age_hours: u32,
}

/// `POST /purge`. Body: `{"age_hours":336}`
pub async fn purge<S, F>(
  State(state): State<AppState<S, F>>,
  _admin: Admin,
  Json(body): Json<PurgeBody>,
) -> Result<Json<Value>, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  let removed = state.service.purge_older_than_hours(body.age_hours).await?;
  Ok(success(json!({ "removed": removed })))
}
