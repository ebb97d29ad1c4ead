//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings in UTC with a fixed
//! nanosecond precision, so they sort correctly as text.

use chrono::{DateTime, SecondsFormat, Utc};
use finderdev_core::{identity::Identity, profile::Profile, store::ProfileRow};

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// Lowercase `text` and wrap it for a substring `LIKE ... ESCAPE '\'` match
/// against `unicode_lower(column)`, escaping the wildcard characters it may
/// contain.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.to_lowercase().chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Column list shared by every profile `SELECT`; `rowid` comes first.
pub const PROFILE_COLUMNS: &str = "rowid, id, username, full_name, avatar_url, bio, \
   website_url, github_url, created_at, updated_at";

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub row_id:      i64,
  pub id:          String,
  pub username:    String,
  pub full_name:   Option<String>,
  pub avatar_url:  Option<String>,
  pub bio:         Option<String>,
  pub website_url: Option<String>,
  pub github_url:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawProfile {
  /// Read a row selected with [`PROFILE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      row_id:      row.get(0)?,
      id:          row.get(1)?,
      username:    row.get(2)?,
      full_name:   row.get(3)?,
      avatar_url:  row.get(4)?,
      bio:         row.get(5)?,
      website_url: row.get(6)?,
      github_url:  row.get(7)?,
      created_at:  row.get(8)?,
      updated_at:  row.get(9)?,
    })
  }

  pub fn into_row(self) -> Result<ProfileRow> {
    let row_id = self.row_id;
    Ok(ProfileRow { row_id, profile: self.into_profile()? })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      id:          self.id,
      username:    self.username,
      full_name:   self.full_name,
      avatar_url:  self.avatar_url,
      bio:         self.bio,
      website_url: self.website_url,
      github_url:  self.github_url,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Column values ready to bind into an `INSERT`; owned so they can move into
/// the connection thread.
pub struct EncodedProfile {
  pub id:          String,
  pub username:    String,
  pub full_name:   Option<String>,
  pub avatar_url:  Option<String>,
  pub bio:         Option<String>,
  pub website_url: Option<String>,
  pub github_url:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl From<&Profile> for EncodedProfile {
  fn from(p: &Profile) -> Self {
    Self {
      id:          p.id.clone(),
      username:    p.username.clone(),
      full_name:   p.full_name.clone(),
      avatar_url:  p.avatar_url.clone(),
      bio:         p.bio.clone(),
      website_url: p.website_url.clone(),
      github_url:  p.github_url.clone(),
      created_at:  encode_dt(p.created_at),
      updated_at:  encode_dt(p.updated_at),
    }
  }
}

impl EncodedProfile {
  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO profiles (
         id, username, full_name, avatar_url, bio,
         website_url, github_url, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      rusqlite::params![
        self.id,
        self.username,
        self.full_name,
        self.avatar_url,
        self.bio,
        self.website_url,
        self.github_url,
        self.created_at,
        self.updated_at,
      ],
    )
  }
}

// ─── Identities ──────────────────────────────────────────────────────────────

/// Raw values read directly from an `identities` row.
pub struct RawIdentity {
  pub id:    String,
  pub email: Option<String>,
}

impl RawIdentity {
  pub fn into_identity(self) -> Identity {
    Identity { id: self.id, email: self.email }
  }
}
