//! [`SqliteStore`], the SQLite implementation of [`ProfileStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use finderdev_core::{
  profile::{Page, Profile, ProfilePatch, ProfileQuery},
  store::{ProfileRow, ProfileStore, RelocateError},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{EncodedProfile, PROFILE_COLUMNS, RawProfile, encode_dt, like_pattern},
  schema::{SCHEMA, register_functions},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A FinderDev profile store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// How long a statement waits on a locked database before failing.
  pub async fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(timeout)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn rows_for(&self, id: &str, limit: Option<i64>) -> Result<Vec<ProfileRow>> {
    let id = id.to_owned();
    let limit = limit.unwrap_or(-1);

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles
           WHERE id = ?1
           ORDER BY created_at ASC, rowid ASC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id, limit], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_row).collect()
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
    let row = self.rows_for(id, Some(1)).await?.into_iter().next();
    Ok(row.map(|r| r.profile))
  }

  async fn list_profile_rows(&self, id: &str) -> Result<Vec<ProfileRow>> {
    self.rows_for(id, None).await
  }

  async fn insert_profile(&self, profile: Profile) -> Result<Profile> {
    let encoded = EncodedProfile::from(&profile);

    self
      .conn
      .call(move |conn| {
        encoded.insert(conn)?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn update_profile(
    &self,
    id:         &str,
    patch:      ProfilePatch,
    updated_at: DateTime<Utc>,
  ) -> Result<Option<Profile>> {
    let id_str = id.to_owned();
    let at_str = encode_dt(updated_at);

    // NULL leaves a column alone; an empty string clears it.
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE profiles SET
             full_name   = CASE WHEN ?2 IS NULL THEN full_name   ELSE NULLIF(?2, '') END,
             bio         = CASE WHEN ?3 IS NULL THEN bio         ELSE NULLIF(?3, '') END,
             avatar_url  = CASE WHEN ?4 IS NULL THEN avatar_url  ELSE NULLIF(?4, '') END,
             website_url = CASE WHEN ?5 IS NULL THEN website_url ELSE NULLIF(?5, '') END,
             github_url  = CASE WHEN ?6 IS NULL THEN github_url  ELSE NULLIF(?6, '') END,
             updated_at  = ?7
           WHERE id = ?1",
          rusqlite::params![
            id_str,
            patch.full_name,
            patch.bio,
            patch.avatar_url,
            patch.website_url,
            patch.github_url,
            at_str,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        Ok(conn
          .query_row(
            &format!(
              "SELECT {PROFILE_COLUMNS} FROM profiles
               WHERE id = ?1
               ORDER BY created_at ASC, rowid ASC
               LIMIT 1"
            ),
            rusqlite::params![id_str],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn delete_profile(&self, id: &str) -> Result<u64> {
    let id = id.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM profiles WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    Ok(deleted as u64)
  }

  async fn delete_rows(&self, row_ids: Vec<i64>) -> Result<u64> {
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
          let mut stmt = tx.prepare("DELETE FROM profiles WHERE rowid = ?1")?;
          for row_id in row_ids {
            deleted += stmt.execute(rusqlite::params![row_id])?;
          }
        }
        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    Ok(deleted as u64)
  }

  async fn search_profiles(&self, query: &ProfileQuery) -> Result<Page<Profile>> {
    let pattern    = query.text.as_deref().map(like_pattern);
    let limit_val  = query.limit as i64;
    let offset_val = i64::try_from(query.offset).unwrap_or(i64::MAX);

    let (total, raws): (i64, Vec<RawProfile>) = self
      .conn
      .call(move |conn| {
        // The pattern is already lowercased; fold the columns to match.
        const FILTER: &str = "?1 IS NULL
           OR unicode_lower(full_name) LIKE ?1 ESCAPE '\\'
           OR unicode_lower(username)  LIKE ?1 ESCAPE '\\'
           OR unicode_lower(bio)       LIKE ?1 ESCAPE '\\'";

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM profiles WHERE {FILTER}"),
          rusqlite::params![pattern],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles
           WHERE {FILTER}
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![pattern, limit_val, offset_val],
            RawProfile::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawProfile::into_profile)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(items, total as u64, query.limit, query.offset))
  }

  /// Delete and re-insert inside one transaction, so a failure at any point
  /// leaves the original row where it was.
  async fn relocate_profile(
    &self,
    current:    Profile,
    target_id:  &str,
    updated_at: DateTime<Utc>,
  ) -> Result<Profile, RelocateError<Error>> {
    let moved      = current.relocated(target_id, updated_at);
    let encoded    = EncodedProfile::from(&moved);
    let current_id = current.id.clone();

    let relocated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let deleted =
          tx.execute("DELETE FROM profiles WHERE id = ?1", rusqlite::params![current_id])?;
        if deleted == 0 {
          return Ok(false);
        }
        encoded.insert(&tx)?;
        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(|e| RelocateError::Unchanged(Error::from(e)))?;

    if relocated {
      tracing::debug!(from = %current.id, to = target_id, "profile row relocated");
      Ok(moved)
    } else {
      Err(RelocateError::Unchanged(Error::ProfileNotFound(current.id)))
    }
  }
}
