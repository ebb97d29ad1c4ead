//! JSON REST API for the FinderDev profile service.
//!
//! Exposes axum [`Router`]s backed by a shared [`ProfileService`]. Auth, TLS
//! and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = finderdev_api::api_router(service.clone())
//!   .merge(finderdev_api::maintenance_router(service).layer(admin_auth));
//! ```

pub mod envelope;
pub mod error;
pub mod extract;
pub mod maintenance;
pub mod profiles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use finderdev_core::{ProfileService, identity::IdentitySource, store::ProfileStore};

pub use envelope::Envelope;
pub use error::ApiError;
pub use extract::JsonBody;

/// The public profile routes.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S, I>(service: Arc<ProfileService<S, I>>) -> Router<()>
where
  S: ProfileStore + 'static,
  I: IdentitySource + 'static,
{
  Router::new()
    .route("/profiles", get(profiles::search::<S, I>))
    .route(
      "/profiles/{id}",
      get(profiles::resolve::<S, I>).patch(profiles::update::<S, I>),
    )
    .route("/profiles/{id}/provision", post(profiles::provision::<S, I>))
    .with_state(service)
}

/// Repair, duplicate and identity routes. Mount behind admin auth.
pub fn maintenance_router<S, I>(service: Arc<ProfileService<S, I>>) -> Router<()>
where
  S: ProfileStore + 'static,
  I: IdentitySource + 'static,
{
  Router::new()
    .route("/profiles/{id}/repair", post(maintenance::repair::<S, I>))
    .route(
      "/profiles/{id}/duplicates",
      get(maintenance::list_duplicates::<S, I>)
        .delete(maintenance::prune_duplicates::<S, I>),
    )
    .route("/identities/{id}", get(maintenance::identity_email::<S, I>))
    .with_state(service)
}

#[cfg(test)]
mod tests;
