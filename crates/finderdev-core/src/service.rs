//! [`ProfileService`]: the profile protocol bound to one store and one
//! identity source.
//!
//! The operations themselves live next to their concerns:
//! [`crate::reconcile`], [`crate::provision`] and [`crate::duplicates`].

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  identity::{EmailMatch, IdentitySource},
  profile::{Page, Profile, ProfileQuery},
  store::{Privilege, ProfileStore, StoreClients},
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// What `repair_identity` does when a profile already exists at the target id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
  /// Delete the drifted row and keep the target row untouched. No field-level
  /// merge happens.
  #[default]
  DiscardCurrent,
  /// Leave both rows in place and report a conflict.
  Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
  #[serde(default)]
  pub conflict_policy: ConflictPolicy,
  #[serde(default)]
  pub email_match:     EmailMatch,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Profile lookup, provisioning, repair and maintenance over a
/// [`ProfileStore`] and an [`IdentitySource`].
///
/// Holds no cache: every call re-reads from the store.
pub struct ProfileService<S, I> {
  pub(crate) store:      S,
  pub(crate) identities: I,
  pub(crate) options:    ReconcileOptions,
  privilege:             Privilege,
}

impl<S, I> ProfileService<S, I>
where
  S: ProfileStore,
  I: IdentitySource,
{
  /// Build a service, settling which store client to use up front.
  pub fn new(
    clients: StoreClients<S>,
    identities: I,
    options: ReconcileOptions,
  ) -> Self {
    let (store, privilege) = clients.select();
    tracing::info!(%privilege, ?options, "profile service ready");
    Self { store, identities, options, privilege }
  }

  pub fn privilege(&self) -> Privilege { self.privilege }

  pub fn options(&self) -> ReconcileOptions { self.options }

  pub fn store(&self) -> &S { &self.store }

  pub fn identities(&self) -> &I { &self.identities }

  /// Page through profiles matching `query`, newest first.
  pub async fn search_profiles(&self, query: ProfileQuery) -> Result<Page<Profile>> {
    let query = query.normalized();
    let page = self
      .store
      .search_profiles(&query)
      .await
      .map_err(|e| Error::store("search_profiles", "*", e))?;
    tracing::debug!(
      text = query.text.as_deref(),
      total = page.total,
      returned = page.items.len(),
      "profile search"
    );
    Ok(page)
  }

  /// Read the email of identity `id` directly from the identity source.
  ///
  /// Unlike the lookup fallback, a provider failure here is an error.
  pub async fn identity_email(&self, id: &str) -> Result<Option<String>> {
    self
      .identities
      .resolve_email(id)
      .await
      .map_err(|e| Error::Identity { id: id.to_owned(), source: Box::new(e) })
  }
}
