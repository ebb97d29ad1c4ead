//! The `{ "success", "data", "error" }` wrapper every response body uses.

use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:   Option<String>,
}

impl<T> Envelope<T> {
  pub fn ok(data: T) -> Self { Self { success: true, data: Some(data), error: None } }

  /// A failure that still carries a payload.
  pub fn failure_with(error: impl Into<String>, data: T) -> Self {
    Self { success: false, data: Some(data), error: Some(error.into()) }
  }
}

impl Envelope {
  pub fn failure(error: impl Into<String>) -> Self {
    Self { success: false, data: None, error: Some(error.into()) }
  }
}

/// Shorthand for a successful JSON body.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> { Json(Envelope::ok(data)) }
