//! Operator endpoints: identity repair, duplicate cleanup and identity reads.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/profiles/{id}/repair` | Body: `{"current_id":"..."}`; moves that row to `{id}` |
//! | `GET`    | `/profiles/{id}/duplicates` | Every row stored under `{id}` |
//! | `DELETE` | `/profiles/{id}/duplicates` | Keeps the oldest row |
//! | `GET`    | `/identities/{id}` | Email registered with the identity provider |
//!
//! None of these authenticate; the server mounts them behind admin auth.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use finderdev_core::{
  ProfileService,
  identity::IdentitySource,
  profile::Profile,
  reconcile::RepairOutcome,
  store::ProfileStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  envelope::{Envelope, ok},
  error::ApiError,
  extract::JsonBody,
};

// ─── Repair ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RepairBody {
  /// Where the profile is stored now.
  pub current_id: String,
}

/// `POST /profiles/{id}/repair`
pub async fn repair<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Path(target_id): Path<String>,
  JsonBody(body): JsonBody<RepairBody>,
) -> Result<Json<Envelope<RepairOutcome>>, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  Ok(ok(service.repair_identity(&body.current_id, &target_id).await?))
}

// ─── Duplicates ──────────────────────────────────────────────────────────────

/// `GET /profiles/{id}/duplicates`
pub async fn list_duplicates<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Path(id): Path<String>,
) -> Result<Json<Envelope<Vec<Profile>>>, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  Ok(ok(service.find_duplicates(&id).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pruned {
  pub deleted: u64,
}

/// `DELETE /profiles/{id}/duplicates`
pub async fn prune_duplicates<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Path(id): Path<String>,
) -> Result<Json<Envelope<Pruned>>, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  let deleted = service.prune_duplicates(&id).await?;
  Ok(ok(Pruned { deleted }))
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityEmail {
  pub id:    String,
  pub email: Option<String>,
}

/// `GET /identities/{id}`: unlike lookup, a provider failure is a 500 here.
pub async fn identity_email<S, I>(
  State(service): State<Arc<ProfileService<S, I>>>,
  Path(id): Path<String>,
) -> Result<Json<Envelope<IdentityEmail>>, ApiError>
where
  S: ProfileStore,
  I: IdentitySource,
{
  let email = service.identity_email(&id).await?;
  Ok(ok(IdentityEmail { id, email }))
}
