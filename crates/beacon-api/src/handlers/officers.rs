//! Officer administration. Every route requires admin credentials.

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
use crate::{AppState, auth::Admin, error::Error};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub officer_id: String,
  pub secret:     String,
}

/// `POST /officers`
pub async fn register<S, F>(
  State(state): State<AppState<S, F>>,
  _admin: Admin,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  state
    .service
    .register_officer(&body.officer_id, &body.secret)
    .await?;
  Ok((StatusCode::CREATED, success(json!({ "officer_id": body.officer_id }))))
}

/// `DELETE /officers/{id}`
pub async fn delete<S, F>(
  State(state): State<AppState<S, F>>,
  _admin: Admin,
  Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  state.service.delete_officer(&id).await?;
  Ok(success(json!({})))
}
