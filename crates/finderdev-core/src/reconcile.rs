//! Profile identity reconciliation.
//!
//! The identity provider and the data store are written independently, so a
//! profile row can end up under an id that no longer matches the provider's
//! user id (reseeded databases, provider project moves, hand-written
//! fixtures). [`ProfileService::resolve_profile`] makes that drift visible;
//! [`ProfileService::repair_identity`] corrects it when a caller asks.
//! Lookup never repairs and never creates.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
  Error, Result,
  identity::IdentitySource,
  profile::{Profile, ProfilePatch},
  service::{ConflictPolicy, ProfileService},
  store::{ProfileStore, RelocateError},
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// The profile row `current_id` belongs to the identity `target_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDrift {
  pub current_id: String,
  pub target_id:  String,
}

/// A profile located for an identity, plus any drift detected on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProfile {
  pub profile: Profile,
  pub drift:   Option<IdentityDrift>,
}

impl ResolvedProfile {
  pub fn needs_sync(&self) -> bool { self.drift.is_some() }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
  Found(ResolvedProfile),
  NotFound,
}

impl Lookup {
  fn exact(profile: Profile) -> Self {
    Self::Found(ResolvedProfile { profile, drift: None })
  }

  pub fn is_found(&self) -> bool { matches!(self, Self::Found(_)) }

  pub fn into_resolved(self) -> Option<ResolvedProfile> {
    match self {
      Self::Found(r) => Some(r),
      Self::NotFound => None,
    }
  }
}

/// Outcome of [`ProfileService::repair_identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
  /// The row now stored at the target id.
  pub profile: Profile,
  /// `true` when a row already existed at the target id and the drifted row
  /// was discarded instead of moved.
  pub merged:  bool,
}

// ─── Operations ──────────────────────────────────────────────────────────────

impl<S, I> ProfileService<S, I>
where
  S: ProfileStore,
  I: IdentitySource,
{
  /// Find the profile that best corresponds to identity `target_id`.
  ///
  /// A row stored under `target_id` wins immediately. Otherwise the identity
  /// owning the same email is located and its profile returned with the
  /// drift attached. Failures inside the email fallback are logged and read
  /// as "not found"; only a store failure on the direct read is an error.
  pub async fn resolve_profile(
    &self,
    target_id: &str,
    known_email: Option<&str>,
  ) -> Result<Lookup> {
    let direct = self
      .store
      .get_profile(target_id)
      .await
      .map_err(|e| Error::store("resolve_profile", target_id, e))?;

    match direct {
      Some(profile) if profile.id == target_id => {
        debug!(target_id, "profile found by id");
        return Ok(Lookup::exact(profile));
      }
      Some(profile) => warn!(
        target_id,
        stored_id = %profile.id,
        "store returned a profile under a different id"
      ),
      None => debug!(target_id, "no profile at id, trying email fallback"),
    }

    let Some(email) = self.fallback_email(target_id, known_email).await else {
      return Ok(Lookup::NotFound);
    };
    let Some(profile) = self.profile_by_email(target_id, &email).await else {
      debug!(target_id, "email fallback found nothing");
      return Ok(Lookup::NotFound);
    };

    if profile.id == target_id {
      return Ok(Lookup::exact(profile));
    }

    warn!(
      target_id,
      current_id = %profile.id,
      "profile found by email under a different id; sync needed"
    );
    let drift = IdentityDrift {
      current_id: profile.id.clone(),
      target_id:  target_id.to_owned(),
    };
    Ok(Lookup::Found(ResolvedProfile { profile, drift: Some(drift) }))
  }

  async fn fallback_email(
    &self,
    target_id: &str,
    known_email: Option<&str>,
  ) -> Option<String> {
    if let Some(email) = known_email {
      return Some(email.to_owned());
    }
    match self.identities.resolve_email(target_id).await {
      Ok(Some(email)) => Some(email),
      Ok(None) => {
        debug!(target_id, "identity has no email");
        None
      }
      Err(e) => {
        warn!(target_id, error = %e, "identity source unavailable for email lookup");
        None
      }
    }
  }

  /// The profile of the first identity other than `target_id` registered
  /// under `email`.
  async fn profile_by_email(&self, target_id: &str, email: &str) -> Option<Profile> {
    let identities = match self.identities.list_identities().await {
      Ok(identities) => identities,
      Err(e) => {
        warn!(error = %e, "identity source unavailable for identity scan");
        return None;
      }
    };

    let matcher = self.options.email_match;
    let owner = identities.into_iter().find(|identity| {
      identity.id != target_id
        && identity
          .email
          .as_deref()
          .is_some_and(|candidate| matcher.matches(candidate, email))
    })?;

    match self.store.get_profile(&owner.id).await {
      Ok(profile) => profile,
      Err(e) => {
        warn!(identity_id = %owner.id, error = %e, "profile read failed during email fallback");
        None
      }
    }
  }

  /// Move the profile at `current_id` to `target_id`.
  ///
  /// Only ever invoked explicitly, typically after [`Self::resolve_profile`]
  /// reported drift. When a row already exists at `target_id` the configured
  /// [`ConflictPolicy`] decides what happens.
  pub async fn repair_identity(
    &self,
    current_id: &str,
    target_id: &str,
  ) -> Result<RepairOutcome> {
    if current_id == target_id {
      return Err(Error::InvalidInput(format!(
        "cannot repair profile {current_id} onto itself"
      )));
    }

    let current = self
      .store
      .get_profile(current_id)
      .await
      .map_err(|e| Error::store("repair_identity", current_id, e))?
      .ok_or_else(|| Error::ProfileNotFound(current_id.to_owned()))?;

    let existing = self
      .store
      .get_profile(target_id)
      .await
      .map_err(|e| Error::store("repair_identity", target_id, e))?;

    if let Some(existing) = existing {
      return match self.options.conflict_policy {
        ConflictPolicy::Reject => {
          warn!(current_id, target_id, "repair refused: target profile exists");
          Err(Error::Conflict {
            current_id: current_id.to_owned(),
            target_id:  target_id.to_owned(),
          })
        }
        ConflictPolicy::DiscardCurrent => {
          warn!(current_id, target_id, "target profile exists; discarding drifted row");
          self
            .store
            .delete_profile(current_id)
            .await
            .map_err(|e| Error::store("repair_identity", current_id, e))?;
          Ok(RepairOutcome { profile: existing, merged: true })
        }
      };
    }

    match self.store.relocate_profile(current, target_id, Utc::now()).await {
      Ok(profile) => {
        info!(current_id, target_id, "profile id repaired");
        Ok(RepairOutcome { profile, merged: false })
      }
      Err(RelocateError::Unchanged(e)) => {
        Err(Error::store("repair_identity", current_id, e))
      }
      Err(RelocateError::Partial { removed, source }) => {
        error!(
          current_id,
          target_id,
          error = %source,
          "profile removed but not recreated; restore from the returned snapshot"
        );
        Err(Error::RepairIncomplete {
          current_id: current_id.to_owned(),
          target_id: target_id.to_owned(),
          removed,
          source: Box::new(source),
        })
      }
    }
  }

  /// Update the display fields of the profile for identity `id`, repairing
  /// drift first so the write lands on the row the identity owns. An invalid
  /// patch is rejected before anything is read or written.
  pub async fn update_profile(&self, id: &str, patch: ProfilePatch) -> Result<Profile> {
    patch.validate()?;

    if let Some(resolved) = self.resolve_profile(id, None).await?.into_resolved()
      && let Some(drift) = resolved.drift
    {
      info!(current_id = %drift.current_id, target_id = %drift.target_id, "repairing drift before update");
      self.repair_identity(&drift.current_id, &drift.target_id).await?;
    }

    self
      .store
      .update_profile(id, patch, Utc::now())
      .await
      .map_err(|e| Error::store("update_profile", id, e))?
      .ok_or_else(|| Error::ProfileNotFound(id.to_owned()))
  }
}
