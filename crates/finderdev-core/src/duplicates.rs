//! Detection and cleanup of profile rows that share an id.
//!
//! More than one row per id means the store's primary-key constraint was
//! bypassed at some point (bulk imports, disabled constraints).

use tracing::{debug, info};

use crate::{
  Error, Result,
  identity::IdentitySource,
  profile::Profile,
  service::ProfileService,
  store::ProfileStore,
};

impl<S, I> ProfileService<S, I>
where
  S: ProfileStore,
  I: IdentitySource,
{
  /// Every row stored under `id`, oldest first. Normally zero or one.
  pub async fn find_duplicates(&self, id: &str) -> Result<Vec<Profile>> {
    let rows = self
      .store
      .list_profile_rows(id)
      .await
      .map_err(|e| Error::store("find_duplicates", id, e))?;
    Ok(rows.into_iter().map(|row| row.profile).collect())
  }

  /// Keep the oldest row under `id` and delete the rest. Returns the number
  /// of rows deleted; a second run deletes nothing.
  pub async fn prune_duplicates(&self, id: &str) -> Result<u64> {
    let rows = self
      .store
      .list_profile_rows(id)
      .await
      .map_err(|e| Error::store("prune_duplicates", id, e))?;

    if rows.len() <= 1 {
      debug!(id, rows = rows.len(), "no duplicate profiles");
      return Ok(0);
    }

    let extra: Vec<i64> = rows.iter().skip(1).map(|row| row.row_id).collect();
    let deleted = self
      .store
      .delete_rows(extra)
      .await
      .map_err(|e| Error::store("prune_duplicates", id, e))?;

    info!(id, deleted, "duplicate profiles pruned");
    Ok(deleted)
  }
}
