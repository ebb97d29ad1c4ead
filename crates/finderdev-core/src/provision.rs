//! Explicit profile provisioning.
//!
//! Lookup never creates profiles. A caller that has confirmed a profile is
//! missing (e.g. from a settings page) provisions one here.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  identity::IdentitySource,
  profile::Profile,
  service::ProfileService,
  store::{ID_COLUMN, ProfileStore, StoreFailure as _, USERNAME_COLUMN},
};

/// Outcome of [`ProfileService::provision_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOutcome {
  pub profile: Profile,
  /// `false` when a profile already existed at the id.
  pub created: bool,
}

/// The username a new profile starts with: the local part of `email`, or
/// `user_` followed by the first eight characters of `id`.
pub fn candidate_username(id: &str, email: Option<&str>) -> String {
  email
    .and_then(|e| e.split('@').next())
    .map(str::trim)
    .filter(|local| !local.is_empty())
    .map(str::to_owned)
    .unwrap_or_else(|| format!("user_{}", id.chars().take(8).collect::<String>()))
}

enum Attempt {
  Created(Profile),
  IdTaken,
  UsernameTaken,
}

impl<S, I> ProfileService<S, I>
where
  S: ProfileStore,
  I: IdentitySource,
{
  /// Return the profile at `id`, creating it first if there is none.
  ///
  /// A username collision is retried exactly once with a millisecond
  /// timestamp suffix. Losing an insert race on `id` is not an error: the
  /// winner's row is returned with `created = false`.
  pub async fn provision_if_absent(
    &self,
    id: &str,
    email: Option<&str>,
  ) -> Result<ProvisionOutcome> {
    if id.trim().is_empty() {
      return Err(Error::InvalidInput("profile id must not be empty".into()));
    }

    if let Some(profile) = self.profile_at(id).await? {
      debug!(id, "profile already provisioned");
      return Ok(ProvisionOutcome { profile, created: false });
    }

    let username = candidate_username(id, email);
    let retry = match self.try_insert(id, &username).await? {
      Attempt::Created(profile) => return Ok(created(profile)),
      Attempt::IdTaken => return self.adopt_existing(id).await,
      Attempt::UsernameTaken => {
        let suffixed = format!("{username}_{}", Utc::now().timestamp_millis());
        warn!(id, username = %username, retry = %suffixed, "username taken, retrying with suffix");
        suffixed
      }
    };

    match self.try_insert(id, &retry).await? {
      Attempt::Created(profile) => Ok(created(profile)),
      Attempt::IdTaken => self.adopt_existing(id).await,
      Attempt::UsernameTaken => Err(Error::UsernameTaken(retry)),
    }
  }

  async fn profile_at(&self, id: &str) -> Result<Option<Profile>> {
    Ok(
      self
        .store
        .get_profile(id)
        .await
        .map_err(|e| Error::store("provision_if_absent", id, e))?
        .filter(|p| p.id == id),
    )
  }

  async fn try_insert(&self, id: &str, username: &str) -> Result<Attempt> {
    let profile = Profile::new(id, username, Utc::now());
    match self.store.insert_profile(profile).await {
      Ok(profile) => Ok(Attempt::Created(profile)),
      Err(e) => {
        let column = e.unique_violation().map(str::to_owned);
        match column.as_deref() {
          Some(USERNAME_COLUMN) => Ok(Attempt::UsernameTaken),
          Some(ID_COLUMN) => Ok(Attempt::IdTaken),
          _ => Err(Error::store("provision_if_absent", id, e)),
        }
      }
    }
  }

  /// Another writer created the row between our read and our insert.
  async fn adopt_existing(&self, id: &str) -> Result<ProvisionOutcome> {
    info!(id, "profile created concurrently; using existing row");
    let profile = self
      .profile_at(id)
      .await?
      .ok_or_else(|| Error::ProfileNotFound(id.to_owned()))?;
    Ok(ProvisionOutcome { profile, created: false })
  }
}

fn created(profile: Profile) -> ProvisionOutcome {
  info!(id = %profile.id, username = %profile.username, "profile provisioned");
  ProvisionOutcome { profile, created: true }
}
