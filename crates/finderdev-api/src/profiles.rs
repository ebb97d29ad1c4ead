//! Handlers for the public `/profiles` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/profiles` | Optional `q`, `limit`, `offset`; newest first |
//! | `GET`   | `/profiles/{id}` | Optional `?email=`; 404 if nothing matches |
//! | `PATCH` | `/profiles/{id}` | Body: [`ProfilePatch`]; repairs drift first |
//! | `POST`  | `/profiles/{id}/provision` | Optional body `{"email":"..."}`; 201 when created |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use finderdev_core::{
  Error,
  ProfileService,
  identity::IdentitySource,
  profile::{DEFAULT_PAGE_SIZE, Page, Profile, ProfilePatch, ProfileQuery},
  reconcile::ResolvedProfile,
  store::ProfileStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  envelope::{Envelope, ok},
  error::ApiError,
  extract::JsonBody,
};

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  /// Substring matched against full name, username and bio.
  pub q:      Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /profiles[?q=...][&limit=...][&offset=...]`
pub async fn search<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<Page<Profile>>>, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  let query = ProfileQuery {
    text:   params.q,
    limit:  params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    offset: params.offset.unwrap_or(0),
  };
  Ok(ok(service.search_profiles(query).await?))
}

// ─── Resolve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
  /// Email already known to the caller; skips the identity lookup.
  pub email: Option<String>,
}

/// A resolved profile with the sync flag spelled out for clients.
#[derive(Debug, Serialize)]
pub struct ResolvedBody {
  #[serde(flatten)]
  pub resolved:   ResolvedProfile,
  pub needs_sync: bool,
}

/// `GET /profiles/{id}[?email=...]`
pub async fn resolve<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Path(id): Path<String>,
  Query(params): Query<ResolveParams>,
) -> Result<Json<Envelope<ResolvedBody>>, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  let resolved = service
    .resolve_profile(&id, params.email.as_deref())
    .await?
    .into_resolved()
    .ok_or(Error::ProfileNotFound(id))?;

  let needs_sync = resolved.needs_sync();
  Ok(ok(ResolvedBody { resolved, needs_sync }))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /profiles/{id}`
pub async fn update<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Path(id): Path<String>,
  JsonBody(patch): JsonBody<ProfilePatch>,
) -> Result<Json<Envelope<Profile>>, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  if patch.is_empty() {
    return Err(ApiError::BadRequest("no fields to update".into()));
  }
  Ok(ok(service.update_profile(&id, patch).await?))
}

// ─── Provision ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ProvisionBody {
  #[serde(default)]
  pub email: Option<String>,
}

/// `POST /profiles/{id}/provision`: 201 with the new row, or 200 with the
/// row that was already there. The body may be omitted.
pub async fn provision<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Path(id): Path<String>,
  body: Option<JsonBody<ProvisionBody>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  let JsonBody(body) = body.unwrap_or_default();
  let outcome = service
    .provision_if_absent(&id, body.email.as_deref())
    .await?;
  let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, ok(outcome)))
}
