//! HTTP surface for Beacon.
//!
//! [`TraceService`] implements the operations over any
//! [`TraceStore`] and [`Forwarder`]; [`router`] exposes them as a JSON API.
//! TLS and process lifecycle are the caller's responsibility.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod service;

pub use error::{Error, Result};
pub use service::{IdentifierBatch, ServiceSettings, TraceService, UploadedTrace};

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use beacon_core::{forward::Forwarder, store::TraceStore};
use tower_http::trace::TraceLayer;

use auth::AdminAuth;
use handlers::{officers, records, subjects, uploads};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, F> {
  pub service: TraceService<S, F>,
  pub admin:   Arc<AdminAuth>,
}

impl<S, F> Clone for AppState<S, F> {
  fn clone(&self) -> Self {
    Self {
      service: self.service.clone(),
      admin:   Arc::clone(&self.admin),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the Beacon API [`Router`].
pub fn router<S, F>(state: AppState<S, F>) -> Router
where
  S: TraceStore + 'static,
  F: Forwarder + 'static,
{
  Router::new()
    .route("/health",                    get(handlers::health))
    // Subjects
    .route("/subjects",                  post(subjects::register::<S, F>))
    .route("/subjects/{id}/pin",         get(subjects::pin::<S, F>))
    .route("/subjects/{id}/identifiers", get(subjects::identifiers::<S, F>))
    .route("/subjects/{id}/contacts",    get(records::contacts::<S, F>))
    // Uploads
    .route("/upload-tokens",             post(uploads::issue_token::<S, F>))
    .route("/uploads",                   post(uploads::upload::<S, F>))
    // Administration
    .route("/officers",                  post(officers::register::<S, F>))
    .route("/officers/{id}",             delete(officers::delete::<S, F>))
    .route("/purge",                     post(records::purge::<S, F>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
