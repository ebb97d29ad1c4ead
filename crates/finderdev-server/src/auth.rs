//! HTTP Basic-auth guard for the maintenance routes.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::Error;

/// Credentials accepted for the maintenance routes.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify Basic credentials from `headers` against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  // An unparsable hash rejects every request.
  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// `axum::middleware::from_fn_with_state` guard.
pub async fn require_admin(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  if let Err(e) = verify_auth(req.headers(), &auth) {
    tracing::warn!(path = %req.uri().path(), "maintenance request rejected");
    return Err(e);
  }
  Ok(next.run(req).await)
}
