//! Request extractors whose rejections use the response [`Envelope`].
//!
//! [`Envelope`]: crate::Envelope

use axum::{
  Json,
  extract::{FromRequest, OptionalFromRequest, Request},
  http::header,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// A JSON request body. Behaves like [`axum::Json`], but a missing, malformed
/// or mistyped body is reported as an [`ApiError`].
///
/// As `Option<JsonBody<T>>` it accepts a request with no body at all: no
/// `Content-Type` header, or `Content-Length: 0`, reads as `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
    let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
    Ok(Self(value))
  }
}

impl<T, S> OptionalFromRequest<S> for JsonBody<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Option<Self>, ApiError> {
    let headers = req.headers();
    let empty = headers
      .get(header::CONTENT_LENGTH)
      .is_some_and(|len| len.as_bytes() == b"0");
    if empty || !headers.contains_key(header::CONTENT_TYPE) {
      return Ok(None);
    }
    <Self as FromRequest<S>>::from_request(req, state).await.map(Some)
  }
}
