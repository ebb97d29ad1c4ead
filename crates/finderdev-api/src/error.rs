//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use finderdev_core::Error as CoreError;
use thiserror::Error;

use crate::envelope::Envelope;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The JSON body was missing, unparseable or of the wrong shape.
  #[error("invalid request body: {}", .0.body_text())]
  Body(#[from] JsonRejection),

  #[error(transparent)]
  Service(#[from] CoreError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Body(rejection) => rejection.status(),
      Self::Service(e) => match e {
        CoreError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Conflict { .. } | CoreError::UsernameTaken(_) => StatusCode::CONFLICT,
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::Store { .. }
        | CoreError::Identity { .. }
        | CoreError::RepairIncomplete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let message = self.to_string();
    let body = match self {
      Self::BadRequest(m) => Envelope::failure(m),
      Self::Body(_) => Envelope::failure(message),
      Self::Service(CoreError::ProfileNotFound(_)) => {
        Envelope::failure("profile not found")
      }
      Self::Service(CoreError::UsernameTaken(_)) => {
        Envelope::failure(format!("could not create profile: {message}"))
      }
      // Hand the removed row back so an operator can restore it.
      Self::Service(CoreError::RepairIncomplete { removed, .. }) => {
        Envelope::failure_with(message, serde_json::json!({ "removed": removed }))
      }
      Self::Service(_) => Envelope::failure(message),
    };
    (status, Json(body)).into_response()
  }
}
