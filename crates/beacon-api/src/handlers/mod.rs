pub mod officers;
pub mod records;
pub mod subjects;
pub mod uploads;

use axum::Json;
use serde_json::{Value, json};

/// `{"status":"SUCCESS"}` merged with the fields of `body`.
pub(super) fn success(body: Value) -> Json<Value> {
  let mut out = json!({ "status": "SUCCESS" });
  if let (Some(out), Value::Object(fields)) = (out.as_object_mut(), body) {
    out.extend(fields);
  }
  Json(out)
}

/// `GET /health`
pub async fn health() -> Json<Value> { success(json!({})) }
