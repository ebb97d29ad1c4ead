//! SQLite backend for the FinderDev profile service.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Besides the `profiles` table the store
//! keeps a small `identities` table so a development setup can run without a
//! hosted authentication provider.

mod encode;
mod identities;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
