//! A local [`IdentitySource`] over the `identities` table.
//!
//! Hosted deployments use the authentication provider directly; this exists
//! for development and tests.

use chrono::Utc;
use finderdev_core::identity::{Identity, IdentitySource};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result, SqliteStore,
  encode::{RawIdentity, encode_dt},
};

impl SqliteStore {
  /// Register a new identity with a random id.
  pub async fn add_identity(&self, email: Option<&str>) -> Result<Identity> {
    self
      .add_identity_with_id(&Uuid::new_v4().to_string(), email)
      .await
  }

  /// Register an identity with a caller-supplied id.
  pub async fn add_identity_with_id(
    &self,
    id: &str,
    email: Option<&str>,
  ) -> Result<Identity> {
    let identity = Identity {
      id:    id.to_owned(),
      email: email.map(str::to_owned),
    };

    let id_str = identity.id.clone();
    let email  = identity.email.clone();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identities (id, email, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, email, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(id = %identity.id, "local identity added");
    Ok(identity)
  }
}

impl IdentitySource for SqliteStore {
  type Error = Error;

  async fn resolve_email(&self, id: &str) -> Result<Option<String>> {
    let id = id.to_owned();

    let email: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT email FROM identities WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(email.flatten())
  }

  async fn list_identities(&self) -> Result<Vec<Identity>> {
    let raws: Vec<RawIdentity> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, email FROM identities ORDER BY created_at ASC, rowid ASC")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawIdentity { id: row.get(0)?, email: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawIdentity::into_identity).collect())
  }
}
