//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use finderdev_api::Envelope;
use thiserror::Error;

/// Rejection produced by the admin auth guard.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(Envelope::failure("unauthorized")))
            .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"finderdev\""),
        );
        res
      }
    }
  }
}

/// Failure of a configured identity source.
#[derive(Debug, Error)]
pub enum IdentityError {
  /// No service key is configured, so the admin API cannot be called.
  #[error("identity provider unavailable: no service key configured")]
  Unavailable,

  #[error("invalid identity provider url: {0}")]
  InvalidUrl(String),

  #[error("identity provider request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("identity provider returned {0}")]
  Status(reqwest::StatusCode),

  #[error("local identity store: {0}")]
  Local(#[from] finderdev_store_sqlite::Error),
}
