//! HTTP server for the FinderDev profile service.
//!
//! Wires configuration, the SQLite store, the configured identity source and
//! the [`finderdev_api`] routers into one axum [`Router`]. The maintenance
//! routes sit behind admin Basic auth.

pub mod auth;
pub mod error;
pub mod identity;

pub use error::{Error, IdentityError};

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use finderdev_core::{
  ProfileService,
  service::ReconcileOptions,
  store::StoreClients,
};
use finderdev_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_admin};
use identity::{GoTrueIdentities, Identities};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `FINDERDEV_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// A second handle opened without row-level restrictions. Preferred when
  /// set, for profile rows and for the local `identities` table alike. It
  /// should name the same database as `store_path`.
  #[serde(default)]
  pub elevated_store_path:   Option<PathBuf>,
  #[serde(default = "default_busy_timeout_ms")]
  pub store_busy_timeout_ms: u64,
  #[serde(default)]
  pub identity:              IdentityConfig,
  #[serde(default)]
  pub reconcile:             ReconcileOptions,
  pub admin_username:        String,
  pub admin_password_hash:   String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProvider {
  /// The `identities` table of the local store.
  #[default]
  Local,
  /// A GoTrue-compatible admin API.
  GoTrue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
  #[serde(default)]
  pub provider:     IdentityProvider,
  #[serde(default)]
  pub url:          String,
  #[serde(default)]
  pub service_key:  Option<String>,
  #[serde(default = "default_identity_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for IdentityConfig {
  fn default() -> Self {
    Self {
      provider:     IdentityProvider::default(),
      url:          String::new(),
      service_key:  None,
      timeout_secs: default_identity_timeout_secs(),
    }
  }
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_busy_timeout_ms() -> u64 { 5_000 }
fn default_identity_timeout_secs() -> u64 { 10 }

// ─── Application state ───────────────────────────────────────────────────────

/// The concrete service the binary runs.
pub type Service = ProfileService<SqliteStore, Identities>;

/// Shared state for building the router.
#[derive(Clone)]
pub struct AppState {
  pub service: Arc<Service>,
  pub auth:    Arc<AuthConfig>,
}

impl AppState {
  /// Open the configured stores and identity source.
  pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
    use anyhow::Context as _;

    let busy = Duration::from_millis(config.store_busy_timeout_ms);
    let restricted = open_store(&config.store_path, busy)
      .await
      .with_context(|| format!("failed to open store at {:?}", config.store_path))?;

    let elevated = match &config.elevated_store_path {
      Some(path) => Some(
        open_store(path, busy)
          .await
          .with_context(|| format!("failed to open elevated store at {path:?}"))?,
      ),
      None => None,
    };

    // Local identities are read through the same handle as profiles.
    let local = elevated.clone().unwrap_or_else(|| restricted.clone());
    let mut clients = StoreClients::restricted(restricted);
    if let Some(elevated) = elevated {
      clients = clients.with_elevated(elevated);
    }

    let identities = match config.identity.provider {
      IdentityProvider::Local => Identities::Local(local),
      IdentityProvider::GoTrue => Identities::GoTrue(
        GoTrueIdentities::new(
          &config.identity.url,
          config.identity.service_key.clone(),
          Duration::from_secs(config.identity.timeout_secs),
        )
        .context("failed to build identity client")?,
      ),
    };

    Ok(Self {
      service: Arc::new(ProfileService::new(clients, identities, config.reconcile)),
      auth:    Arc::new(AuthConfig {
        username:      config.admin_username.clone(),
        password_hash: config.admin_password_hash.clone(),
      }),
    })
  }
}

async fn open_store(
  path: &std::path::Path,
  busy: Duration,
) -> finderdev_store_sqlite::Result<SqliteStore> {
  let store = SqliteStore::open(path).await?;
  store.set_busy_timeout(busy).await?;
  Ok(store)
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router(state: AppState) -> Router {
  let maintenance = finderdev_api::maintenance_router(state.service.clone())
    .layer(middleware::from_fn_with_state(state.auth.clone(), require_admin));

  finderdev_api::api_router(state.service)
    .merge(maintenance)
    .layer(TraceLayer::new_for_http())
}
