//! # Brawlhub Database Crate
//!
//! A typed wrapper over pooled MySQL connections for the rest of the
//! platform. It normalizes heterogeneous SQL outcomes into two
//! disciplined result shapes, provides all-or-nothing multi-statement
//! transactions, and maps every failure to a structured error the HTTP
//! layer can classify in one place.
//!
//! ## Architectural Principles
//!
//! - **Explicit context:** the pool handle ([`Db`]) is constructed once at
//!   process start and passed into every component that needs it. There is
//!   no module-level singleton and no racing background probe.
//! - **Policy at the call site:** every read declares whether zero rows is
//!   valid ([`OnEmpty`]); every write declares whether zero affected rows
//!   is valid ([`OnZeroAffected`]). The classifier turns those markers
//!   into the right HTTP status without per-caller emptiness checks.
//! - **One release per borrow:** transaction connections are scoped
//!   guards; every terminal path (commit, business failure, driver
//!   failure) releases the connection exactly once.
//!
//! ## Public API
//!
//! - [`Db`]: the pool handle: `connect`, `fetch_rows`, `execute`,
//!   `transaction`, `close`.
//! - [`Repository`]: the per-entity query functions built on top of it.
//! - [`DbError`]: the failure taxonomy, with [`DbError::classify`] mapping
//!   each failure to a status/message pair.
//! - [`codec`]: the structured-text codec for JSON text columns.

// Declare the modules that constitute this crate.
pub mod codec;
pub mod connection;
pub mod error;
pub mod query;
pub mod repository;
pub mod transaction;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{Db, PoolState};
pub use error::{classify_code, DbError, GENERIC_DB_MESSAGE};
pub use query::{execute_on, fetch_rows_on, Mutation, OnEmpty, OnZeroAffected, Param};
pub use repository::Repository;
