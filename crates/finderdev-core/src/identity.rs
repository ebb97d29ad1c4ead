//! The `IdentitySource` trait: the authentication provider's view of users.
//!
//! Profiles do not store email addresses, so the only way to connect a
//! profile to an email is through the identity that owns it.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// A user as known to the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:    String,
  pub email: Option<String>,
}

/// How the email fallback compares addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailMatch {
  /// Byte-for-byte equality.
  #[default]
  Exact,
  /// Trim surrounding whitespace and compare lowercased.
  CaseInsensitive,
}

impl EmailMatch {
  pub fn matches(self, candidate: &str, wanted: &str) -> bool {
    match self {
      Self::Exact => candidate == wanted,
      Self::CaseInsensitive => {
        candidate.trim().to_lowercase() == wanted.trim().to_lowercase()
      }
    }
  }
}

/// Abstraction over the authentication provider.
///
/// Implementations without administrative access should fail every call
/// rather than pretend no identities exist; the reconciliation fallback logs
/// the failure and carries on.
pub trait IdentitySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The email registered for identity `id`, or `None` if the identity is
  /// unknown or has no email.
  fn resolve_email<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Every identity the provider knows about. Linear in the user base.
  fn list_identities(
    &self,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;
}
