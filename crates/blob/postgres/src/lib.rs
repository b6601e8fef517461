//! `PostgreSQL` blob store for Vitrine.
//!
//! Payloads are stored as `BYTEA` chunks next to a metadata row. The
//! [`Database`] owns the pool and publishes its reachability to every
//! [`PostgresBlobStore`] it hands out.

mod config;
mod connection;
mod migrations;
mod store;

pub use config::PostgresBlobConfig;
pub use connection::{ConnectionState, Database, DatabaseError};
pub use migrations::run_migrations;
pub use store::PostgresBlobStore;
