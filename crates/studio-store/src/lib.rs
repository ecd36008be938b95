//! # studio-store
//!
//! `SQLite` persistence for AgentScope Studio.
//!
//! - **Schema**: plain SQL definitions for runs, replies, messages, spans and
//!   input requests, with explicit foreign keys and cascade rules
//! - **Connection**: an `r2d2` pool owned by an explicit [`Database`] handle
//! - **Migrations**: version-tracked forward/backward steps, SQL or Rust
//! - **Repositories**: stateless structs whose methods take `&Connection`
//! - **Bootstrap**: [`initialize_database`] converges the schema and repairs
//!   state left behind by a previous process

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod database;
pub mod errors;
pub mod sqlite;

pub use bootstrap::{BootstrapReport, DatabaseConfig, initialize_database, initialize_with_report};
pub use database::{AppendOutcome, Database};
pub use errors::{Result, StoreError};
pub use sqlite::{ConnectionConfig, ConnectionPool, PooledConnection};
