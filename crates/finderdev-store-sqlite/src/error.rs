//! Error type for `finderdev-store-sqlite`.

use finderdev_core::store::StoreFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The row a relocation was asked to move has disappeared.
  #[error("profile not found: {0}")]
  ProfileNotFound(String),
}

impl StoreFailure for Error {
  /// SQLite reports unique and primary-key violations alike as
  /// `UNIQUE constraint failed: <table>.<column>[, ...]`.
  fn unique_violation(&self) -> Option<&str> {
    let Error::Database(tokio_rusqlite::Error::Rusqlite(
      rusqlite::Error::SqliteFailure(failure, Some(message)),
    )) = self
    else {
      return None;
    };
    if failure.code != rusqlite::ErrorCode::ConstraintViolation {
      return None;
    }

    let columns = message.strip_prefix("UNIQUE constraint failed: ")?;
    let first = columns.split(',').next()?.trim();
    Some(first.rsplit_once('.').map_or(first, |(_, column)| column))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
