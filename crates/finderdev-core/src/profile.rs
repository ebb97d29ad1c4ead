//! Profile rows and the query types used to read and modify them.
//!
//! A profile is one developer's public card. Its `id` is expected to equal the
//! identity provider's user id, but nothing enforces that across the two
//! systems; see [`crate::reconcile`] for how drift is detected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub id:          String,
  /// Unique across all profiles (enforced by the store).
  pub username:    String,
  pub full_name:   Option<String>,
  pub avatar_url:  Option<String>,
  pub bio:         Option<String>,
  pub website_url: Option<String>,
  pub github_url:  Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Profile {
  /// A fresh profile with every optional display field empty.
  pub fn new(
    id: impl Into<String>,
    username: impl Into<String>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id:          id.into(),
      username:    username.into(),
      full_name:   None,
      avatar_url:  None,
      bio:         None,
      website_url: None,
      github_url:  None,
      created_at:  now,
      updated_at:  now,
    }
  }

  /// The same profile under a different id. Every other field is kept except
  /// `updated_at`.
  pub fn relocated(&self, id: &str, updated_at: DateTime<Utc>) -> Self {
    Self { id: id.to_owned(), updated_at, ..self.clone() }
  }
}

// ─── ProfilePatch ────────────────────────────────────────────────────────────

/// Bounds on `full_name`, in characters.
pub const FULL_NAME_CHARS: std::ops::RangeInclusive<usize> = 2..=100;

/// Longest accepted `bio`, in characters.
pub const MAX_BIO_CHARS: usize = 1000;

/// A partial update of the display fields.
///
/// `None` leaves a field untouched; `Some("")` clears it to null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
  pub full_name:   Option<String>,
  pub bio:         Option<String>,
  pub avatar_url:  Option<String>,
  pub website_url: Option<String>,
  pub github_url:  Option<String>,
}

impl ProfilePatch {
  pub fn is_empty(&self) -> bool {
    self.full_name.is_none()
      && self.bio.is_none()
      && self.avatar_url.is_none()
      && self.website_url.is_none()
      && self.github_url.is_none()
  }

  /// Check every present field against the profile rules.
  ///
  /// - `full_name` must hold 2 to 100 characters.
  /// - `bio` may hold at most 1000 characters; `""` clears it.
  /// - URL fields must be absolute `http`/`https` URLs, or `""` to clear.
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.full_name
      && !FULL_NAME_CHARS.contains(&name.chars().count())
    {
      return Err(Error::InvalidInput(format!(
        "full_name must be {} to {} characters",
        FULL_NAME_CHARS.start(),
        FULL_NAME_CHARS.end()
      )));
    }

    if let Some(bio) = &self.bio
      && bio.chars().count() > MAX_BIO_CHARS
    {
      return Err(Error::InvalidInput(format!(
        "bio must be at most {MAX_BIO_CHARS} characters"
      )));
    }

    for (field, value) in [
      ("avatar_url", &self.avatar_url),
      ("website_url", &self.website_url),
      ("github_url", &self.github_url),
    ] {
      if let Some(value) = value
        && !value.is_empty()
        && !is_web_url(value)
      {
        return Err(Error::InvalidInput(format!("{field} must be an http(s) url")));
      }
    }

    Ok(())
  }

  /// Apply the patch in place, stamping `updated_at`.
  pub fn apply(&self, profile: &mut Profile, updated_at: DateTime<Utc>) {
    fn set(field: &mut Option<String>, value: &Option<String>) {
      if let Some(v) = value {
        *field = (!v.is_empty()).then(|| v.clone());
      }
    }

    set(&mut profile.full_name, &self.full_name);
    set(&mut profile.bio, &self.bio);
    set(&mut profile.avatar_url, &self.avatar_url);
    set(&mut profile.website_url, &self.website_url);
    set(&mut profile.github_url, &self.github_url);
    profile.updated_at = updated_at;
  }
}

fn is_web_url(value: &str) -> bool {
  url::Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

// ─── Search ──────────────────────────────────────────────────────────────────

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Largest offset a query keeps; larger values read as an empty page.
pub const MAX_OFFSET: usize = i64::MAX as usize;

/// Parameters for [`crate::store::ProfileStore::search_profiles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileQuery {
  /// Case-insensitive substring matched against full name, username and bio.
  pub text:   Option<String>,
  pub limit:  usize,
  pub offset: usize,
}

impl Default for ProfileQuery {
  fn default() -> Self {
    Self { text: None, limit: DEFAULT_PAGE_SIZE, offset: 0 }
  }
}

impl ProfileQuery {
  /// Clamp `limit` into `1..=MAX_PAGE_SIZE`, cap `offset` at what SQL
  /// `OFFSET` can express, and drop blank search text.
  pub fn normalized(self) -> Self {
    Self {
      text:   self
        .text
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty()),
      limit:  self.limit.clamp(1, MAX_PAGE_SIZE),
      offset: self.offset.min(MAX_OFFSET),
    }
  }
}

/// One page of results plus enough bookkeeping to fetch the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:    Vec<T>,
  /// Total number of matches across all pages.
  pub total:    u64,
  pub limit:    usize,
  pub offset:   usize,
  pub has_more: bool,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, total: u64, limit: usize, offset: usize) -> Self {
    let has_more = total > offset.saturating_add(limit) as u64;
    Self { items, total, limit, offset, has_more }
  }
}
