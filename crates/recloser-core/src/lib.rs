//! Core types and storage for the recloser configuration catalog.
//!
//! Provides the catalog data model ([`model`]), the read contract every derived
//! operation depends on ([`store::CatalogStore`]), the error taxonomy, TOML
//! configuration, versioned schema scripts and the SQLite-backed store.

pub mod config;
pub mod error;
pub mod model;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use error::{CatalogError, ErrorCode, Result};
pub use store::CatalogStore;
