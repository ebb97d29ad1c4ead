//! Core types and trait definitions for the FinderDev profile service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! data store and the identity provider are reached only through the
//! [`store::ProfileStore`] and [`identity::IdentitySource`] traits, and the
//! reconciliation protocol in [`service::ProfileService`] is written against
//! those traits alone.

pub mod duplicates;
pub mod error;
pub mod identity;
pub mod profile;
pub mod provision;
pub mod reconcile;
pub mod service;
pub mod store;

pub use error::{BoxError, Error, Result};
pub use service::ProfileService;
