//! Identity sources the server can be configured with.
//!
//! [`GoTrueIdentities`] talks to the hosted authentication provider's admin
//! API; [`Identities`] picks between it and the local table at startup.

use std::time::Duration;

use finderdev_core::identity::{Identity, IdentitySource};
use finderdev_store_sqlite::SqliteStore;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::IdentityError;

/// Users fetched per admin-list request.
const PAGE_SIZE: usize = 50;

/// Upper bound on admin-list requests per scan.
const MAX_PAGES: usize = 200;

// ─── GoTrue ──────────────────────────────────────────────────────────────────

/// Admin client for a GoTrue-compatible authentication server.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GoTrueIdentities {
  client:      Client,
  base_url:    Url,
  service_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminUser {
  id:    String,
  email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminUserPage {
  #[serde(default)]
  users: Vec<AdminUser>,
}

impl From<AdminUser> for Identity {
  fn from(user: AdminUser) -> Self {
    // GoTrue reports "no email" as an empty string for phone-only users.
    let email = user.email.filter(|e| !e.is_empty());
    Identity { id: user.id, email }
  }
}

impl GoTrueIdentities {
  /// `service_key` is the provider's service-role key. Without one every call
  /// fails with [`IdentityError::Unavailable`].
  pub fn new(
    base_url: &str,
    service_key: Option<String>,
    timeout: Duration,
  ) -> Result<Self, IdentityError> {
    let parsed = Url::parse(base_url)
      .map_err(|e| IdentityError::InvalidUrl(format!("{base_url}: {e}")))?;
    if parsed.cannot_be_a_base() {
      return Err(IdentityError::InvalidUrl(base_url.to_owned()));
    }

    let client = Client::builder().timeout(timeout).build()?;
    if service_key.is_none() {
      tracing::warn!("no identity service key configured; email fallback disabled");
    }
    Ok(Self { client, base_url: parsed, service_key })
  }

  /// `{base}/auth/v1/admin/{segments...}`. Each segment is percent-encoded
  /// on its own, so `/`, `?` and `#` inside one stay inside it.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // `new` rejected cannot-be-a-base URLs, so this always succeeds.
    if let Ok(mut path) = url.path_segments_mut() {
      path
        .pop_if_empty()
        .extend(["auth", "v1", "admin"])
        .extend(segments);
    }
    url
  }

  fn authorized(
    &self,
    req: reqwest::RequestBuilder,
  ) -> Result<reqwest::RequestBuilder, IdentityError> {
    let key = self.service_key.as_deref().ok_or(IdentityError::Unavailable)?;
    Ok(req.header("apikey", key).bearer_auth(key))
  }

  async fn get_user(&self, id: &str) -> Result<Option<AdminUser>, IdentityError> {
    // Dot segments are dropped by URL normalisation and would address the
    // user list instead; no user has such an id.
    if id.is_empty() || id == "." || id == ".." {
      return Ok(None);
    }

    let resp = self
      .authorized(self.client.get(self.url(&["users", id])))?
      .send()
      .await?;

    match resp.status() {
      StatusCode::NOT_FOUND => Ok(None),
      status if status.is_success() => Ok(Some(resp.json().await?)),
      status => Err(IdentityError::Status(status)),
    }
  }

  async fn list_page(&self, page: usize) -> Result<Vec<AdminUser>, IdentityError> {
    let resp = self
      .authorized(self.client.get(self.url(&["users"])))?
      .query(&[("page", page), ("per_page", PAGE_SIZE)])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(IdentityError::Status(resp.status()));
    }
    let body: AdminUserPage = resp.json().await?;
    Ok(body.users)
  }
}

impl IdentitySource for GoTrueIdentities {
  type Error = IdentityError;

  async fn resolve_email(&self, id: &str) -> Result<Option<String>, IdentityError> {
    Ok(self.get_user(id).await?.map(Identity::from).and_then(|i| i.email))
  }

  async fn list_identities(&self) -> Result<Vec<Identity>, IdentityError> {
    let mut all = Vec::new();
    let mut previous_first: Option<String> = None;

    for page in 1..=MAX_PAGES {
      let users = self.list_page(page).await?;
      let first = users.first().map(|u| u.id.clone());
      if first.is_some() && first == previous_first {
        tracing::warn!(page, "identity provider repeated a page; stopping scan");
        break;
      }

      let last = users.len() < PAGE_SIZE;
      all.extend(users.into_iter().map(Identity::from));
      if last {
        break;
      }
      if page == MAX_PAGES {
        tracing::warn!(pages = MAX_PAGES, "identity scan hit the page limit");
      }
      previous_first = first;
    }

    tracing::debug!(count = all.len(), "listed provider identities");
    Ok(all)
  }
}

// ─── Runtime choice ──────────────────────────────────────────────────────────

/// The identity source selected by configuration.
#[derive(Clone)]
pub enum Identities {
  Local(SqliteStore),
  GoTrue(GoTrueIdentities),
}

impl IdentitySource for Identities {
  type Error = IdentityError;

  async fn resolve_email(&self, id: &str) -> Result<Option<String>, IdentityError> {
    match self {
      Self::Local(store) => Ok(store.resolve_email(id).await?),
      Self::GoTrue(gotrue) => gotrue.resolve_email(id).await,
    }
  }

  async fn list_identities(&self) -> Result<Vec<Identity>, IdentityError> {
    match self {
      Self::Local(store) => Ok(store.list_identities().await?),
      Self::GoTrue(gotrue) => gotrue.list_identities().await,
    }
  }
}
