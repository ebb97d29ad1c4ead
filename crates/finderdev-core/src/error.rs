//! Error types for `finderdev-core`.

use thiserror::Error;

use crate::profile::Profile;

/// A type-erased error from a collaborator (data store or identity provider).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A normal negative result; maps to "profile not found".
  #[error("profile not found: {0}")]
  ProfileNotFound(String),

  /// Repair found rows at both ids and the conflict policy refused to fold
  /// one into the other.
  #[error("profile {target_id} already exists; refusing to fold {current_id} into it")]
  Conflict {
    current_id: String,
    target_id:  String,
  },

  /// Both provisioning attempts collided on the username column.
  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("{operation} failed for profile {id}: {source}")]
  Store {
    operation: &'static str,
    id:        String,
    #[source]
    source:    BoxError,
  },

  /// The identity provider failed during a read the caller asked for
  /// explicitly. Never produced by the lookup fallback.
  #[error("identity lookup failed for {id}: {source}")]
  Identity {
    id:     String,
    #[source]
    source: BoxError,
  },

  /// The row at `current_id` was deleted but the copy at `target_id` was never
  /// written. `removed` holds everything needed to restore it.
  #[error(
    "profile {current_id} was removed but could not be written at {target_id}: {source}"
  )]
  RepairIncomplete {
    current_id: String,
    target_id:  String,
    removed:    Box<Profile>,
    #[source]
    source:     BoxError,
  },
}

impl Error {
  pub(crate) fn store(
    operation: &'static str,
    id: &str,
    source: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Store { operation, id: id.to_owned(), source: Box::new(source) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
