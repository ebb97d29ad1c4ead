//! The `ProfileStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `finderdev-store-sqlite`).
//! [`crate::ProfileService`] depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::{Page, Profile, ProfilePatch, ProfileQuery};

/// Column names reported by [`StoreFailure::unique_violation`].
pub const ID_COLUMN: &str = "id";
pub const USERNAME_COLUMN: &str = "username";

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Lets the service tell an expected uniqueness conflict apart from a fatal
/// store failure without knowing the backend's error type.
pub trait StoreFailure: std::error::Error + Send + Sync + 'static {
  /// The column whose unique constraint rejected a write, if that is what
  /// happened.
  fn unique_violation(&self) -> Option<&str>;
}

/// Failure of [`ProfileStore::relocate_profile`], split by what was left
/// behind.
#[derive(Debug)]
pub enum RelocateError<E> {
  /// Nothing was written; the row is still at its original id.
  Unchanged(E),
  /// The original row was deleted but the replacement was never written.
  Partial { removed: Box<Profile>, source: E },
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A profile together with the backend's handle for its physical row.
///
/// Rows sharing an `id` are only distinguishable by `row_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRow {
  pub row_id:  i64,
  pub profile: Profile,
}

// ─── Client selection ────────────────────────────────────────────────────────

/// Which store client the service ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
  /// Subject to the store's row-level access policy.
  Restricted,
  /// Bypasses row-level access policy.
  Elevated,
}

impl std::fmt::Display for Privilege {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Restricted => f.write_str("restricted"),
      Self::Elevated => f.write_str("elevated"),
    }
  }
}

/// The store clients available at startup. The elevated one wins when
/// present; the choice is made once, in [`StoreClients::select`].
#[derive(Debug, Clone)]
pub struct StoreClients<S> {
  pub restricted: S,
  pub elevated:   Option<S>,
}

impl<S> StoreClients<S> {
  pub fn restricted(store: S) -> Self { Self { restricted: store, elevated: None } }

  pub fn with_elevated(self, store: S) -> Self {
    Self { elevated: Some(store), ..self }
  }

  pub fn select(self) -> (S, Privilege) {
    match self.elevated {
      Some(store) => (store, Privilege::Elevated),
      None => (self.restricted, Privilege::Restricted),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the profile table of a data store backend.
///
/// "No such row" is always `Ok(None)` (or an empty collection), never an
/// error. All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ProfileStore: Send + Sync {
  type Error: StoreFailure;

  /// The profile stored under `id`. If duplicate rows exist the oldest is
  /// returned.
  fn get_profile<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Every row stored under `id`, oldest `created_at` first.
  fn list_profile_rows<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Vec<ProfileRow>, Self::Error>> + Send + 'a;

  /// Persist `profile` exactly as given (timestamps included).
  ///
  /// A unique-constraint rejection must be reported through
  /// [`StoreFailure::unique_violation`] with [`ID_COLUMN`] or
  /// [`USERNAME_COLUMN`].
  fn insert_profile(
    &self,
    profile: Profile,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  /// Apply `patch` to the profile at `id`. Returns `None` if there is none.
  fn update_profile<'a>(
    &'a self,
    id: &'a str,
    patch: ProfilePatch,
    updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Delete every row stored under `id`; returns the number deleted.
  fn delete_profile<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Delete specific physical rows; returns the number deleted.
  fn delete_rows(
    &self,
    row_ids: Vec<i64>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Page through profiles, newest first.
  fn search_profiles<'a>(
    &'a self,
    query: &'a ProfileQuery,
  ) -> impl Future<Output = Result<Page<Profile>, Self::Error>> + Send + 'a;

  /// Move `current` to `target_id`, keeping every field except `id` and
  /// `updated_at`.
  ///
  /// The provided implementation deletes and then inserts, so a failed
  /// insert leaves no row at either id; it reports that as
  /// [`RelocateError::Partial`]. Backends with transactions should override
  /// it with an atomic version.
  fn relocate_profile<'a>(
    &'a self,
    current: Profile,
    target_id: &'a str,
    updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Profile, RelocateError<Self::Error>>> + Send + 'a
  {
    async move {
      self
        .delete_profile(&current.id)
        .await
        .map_err(RelocateError::Unchanged)?;

      let moved = current.relocated(target_id, updated_at);
      self.insert_profile(moved).await.map_err(|source| {
        RelocateError::Partial { removed: Box::new(current), source }
      })
    }
  }
}
