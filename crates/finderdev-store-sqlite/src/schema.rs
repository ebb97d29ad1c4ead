//! SQL schema for the FinderDev SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per developer. `id` mirrors the identity provider's user id but
-- nothing ties the two together; drift is detected by the service.
CREATE TABLE IF NOT EXISTS profiles (
    id          TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    full_name   TEXT,
    avatar_url  TEXT,
    bio         TEXT,
    website_url TEXT,
    github_url  TEXT,
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, nanosecond precision
    updated_at  TEXT NOT NULL
);

-- Local stand-in for the authentication provider's user list. Emails are not
-- unique: a stale identity may still carry the address of its replacement.
CREATE TABLE IF NOT EXISTS identities (
    id         TEXT PRIMARY KEY,
    email      TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS profiles_created_idx ON profiles(created_at);
CREATE INDEX IF NOT EXISTS identities_email_idx ON identities(email);

PRAGMA user_version = 1;
";

/// Name of the scalar SQL function that lowercases with full Unicode case
/// mapping. SQLite's own `lower()` and `LIKE` only fold ASCII.
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Register the store's scalar functions on `conn`. Functions are
/// per-connection, so this runs alongside [`SCHEMA`].
pub fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  use rusqlite::functions::FunctionFlags;

  conn.create_scalar_function(
    UNICODE_LOWER,
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.map(|t| t.to_lowercase()))
    },
  )
}
