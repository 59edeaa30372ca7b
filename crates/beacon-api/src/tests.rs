//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use beacon_core::{forward::LogForwarder, memory::MemoryStore};
use beacon_crypto::SymmetricKey;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{
  AppState, ServiceSettings, TraceService, auth::{AdminAuth, OFFICER_SECRET_HEADER},
  router,
};

const SUBJECT: &str = "123456789012345678901";
const CONTACT: &str = "abcdefghijklmnopqrstu";

fn app() -> (Router, AppState<MemoryStore, LogForwarder>) {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(b"hunter2", &salt)
    .unwrap()
    .to_string();

  let state = AppState {
    service: TraceService::new(
      Arc::new(MemoryStore::new()),
      Arc::new(LogForwarder),
      Arc::new(SymmetricKey::from_bytes(&[9u8; 32]).unwrap()),
      ServiceSettings { identifier_count: 3, ..ServiceSettings::default() },
    ),
    admin:   Arc::new(AdminAuth {
      username:      "admin".into(),
      password_hash: hash,
    }),
  };
  (router(state.clone()), state)
}

fn admin() -> String {
  format!("Basic {}", B64.encode("admin:hunter2"))
}

fn json_request(method: Method, uri: &str) -> axum::http::request::Builder {
  Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, body)
}

fn with_body(builder: axum::http::request::Builder, body: Value) -> Request<Body> {
  builder.body(Body::from(body.to_string())).unwrap()
}

// ─── Public routes ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
  let (app, _) = app();
  let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "SUCCESS");
}

#[tokio::test]
async fn pin_lookup() {
  let (app, state) = app();
  state.service.register_subject(SUBJECT, "ABCDEF").await.unwrap();

  let req = Request::builder()
    .uri(format!("/subjects/{SUBJECT}/pin"))
    .body(Body::empty())
    .unwrap();
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["pin"], "ABCDEF");

  let req = Request::builder()
    .uri("/subjects/nobody/pin")
    .body(Body::empty())
    .unwrap();
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["status"], "FAIL");
}

#[tokio::test]
async fn identifiers_for_subject() {
  let (app, _) = app();
  let req = Request::builder()
    .uri(format!("/subjects/{SUBJECT}/identifiers"))
    .body(Body::empty())
    .unwrap();
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["identifiers"].as_array().unwrap().len(), 3);
  assert!(body["refresh_time"].as_i64().unwrap() > 0);

  let req = Request::builder()
    .uri("/subjects/short/identifiers")
    .body(Body::empty())
    .unwrap();
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Officer routes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn subject_registration_needs_an_officer() {
  let (app, state) = app();
  state.service.register_officer("off1", "sec1").await.unwrap();
  let body = json!({ "uid": SUBJECT, "pin": "ABCDEF" });

  let req = with_body(json_request(Method::POST, "/subjects"), body.clone());
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = with_body(
    json_request(Method::POST, "/subjects").header(OFFICER_SECRET_HEADER, "wrong"),
    body.clone(),
  );
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = with_body(
    json_request(Method::POST, "/subjects").header(OFFICER_SECRET_HEADER, "sec1"),
    body,
  );
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(state.service.handshake_pin(SUBJECT).await.unwrap(), "ABCDEF");
}

#[tokio::test]
async fn upload_flow_over_http() {
  let (app, state) = app();
  state.service.register_officer("off1", "sec1").await.unwrap();

  let heard = state
    .service
    .generate_identifiers(SUBJECT)
    .unwrap()
    .identifiers
    .remove(0);

  let body = json!({ "uid": CONTACT });
  let req = with_body(
    json_request(Method::POST, "/upload-tokens")
      .header(OFFICER_SECRET_HEADER, "sec1"),
    body,
  );
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  let token = body["token"].as_str().unwrap().to_owned();

  tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

  let upload = json!({
    "uid": CONTACT,
    "uploadToken": token,
    "traces": [{
      "msg": heard.ciphertext,
      "timestamp": i64::from(heard.start_time) + 60,
      "modelC": "Pixel 4",
      "modelP": "iPhone 11",
      "rssi": -70,
      "txPower": 8,
      "org": "ID_HT",
    }],
  });
  let req = with_body(json_request(Method::POST, "/uploads"), upload);
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 1);

  let req = Request::builder()
    .uri(format!("/subjects/{CONTACT}/contacts"))
    .header(header::AUTHORIZATION, admin())
    .body(Body::empty())
    .unwrap();
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["trace"][0]["contact_subject_id"], SUBJECT);
  assert_eq!(body["trace"][0]["officer_id"], "off1");
}

#[tokio::test]
async fn upload_token_route_resolves_the_secret() {
  let (app, state) = app();
  state.service.register_officer("off1", "sec1").await.unwrap();
  let body = json!({ "uid": CONTACT });

  let req = with_body(json_request(Method::POST, "/upload-tokens"), body.clone());
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = with_body(
    json_request(Method::POST, "/upload-tokens").header(OFFICER_SECRET_HEADER, "wrong"),
    body,
  );
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["status"], "FAIL");

  let oversized = json!({ "uid": "u".repeat(beacon_core::store::MAX_ID_LEN + 1) });
  let req = with_body(
    json_request(Method::POST, "/upload-tokens").header(OFFICER_SECRET_HEADER, "sec1"),
    oversized,
  );
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_tokens_share_one_response() {
  let (app, _) = app();
  let mut bodies = Vec::new();
  for token in ["", "AAAA", "not base64!", "QUJD"] {
    let upload = json!({ "uid": CONTACT, "uploadToken": token, "traces": [] });
    let req = with_body(json_request(Method::POST, "/uploads"), upload);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token:?}");
    bodies.push(body);
  }
  assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}

// ─── Admin routes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn officer_admin_requires_credentials() {
  let (app, state) = app();
  let body = json!({ "officer_id": "off9", "secret": "sec9" });

  let req = with_body(json_request(Method::POST, "/officers"), body.clone());
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = with_body(
    json_request(Method::POST, "/officers").header(header::AUTHORIZATION, admin()),
    body,
  );
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(state.service.resolve_officer("sec9").await.unwrap(), "off9");

  let clash = json!({ "officer_id": "off10", "secret": "sec9" });
  let req = with_body(
    json_request(Method::POST, "/officers").header(header::AUTHORIZATION, admin()),
    clash,
  );
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let req = Request::builder()
    .method(Method::DELETE)
    .uri("/officers/off9")
    .header(header::AUTHORIZATION, admin())
    .body(Body::empty())
    .unwrap();
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert!(state.service.resolve_officer("sec9").await.is_err());
}

#[tokio::test]
async fn purge_requires_admin() {
  let (app, _) = app();
  let body = json!({ "age_hours": 24 });

  let req = with_body(json_request(Method::POST, "/purge"), body.clone());
  let (status, _) = send(&app, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = with_body(
    json_request(Method::POST, "/purge").header(header::AUTHORIZATION, admin()),
    body,
  );
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["removed"], 0);
}
