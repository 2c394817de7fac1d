//! # Nodelab Database Crate
//!
//! Owns the application's single database handle and the rules for using it.
//!
//! ## Architectural Principles
//!
//! - **Built from configuration:** [`ConnectionDescriptor`] derives the
//!   connection from the config store, either a verbatim `database.dsn` or the
//!   individual `database.*` fields. Incomplete settings fail before any
//!   connection is attempted.
//! - **Valid or absent:** [`Database::new`] only returns after the connection
//!   has answered a ping, and only then registers its close hook with the
//!   host lifecycle.
//! - **Atomic units of work:** [`Database::with_transaction`] commits only when
//!   the caller's function returns `Ok`, rolls back on `Err`, and rolls back
//!   before letting a panic continue.
//! - **Driver chosen at runtime:** the handle is an `sqlx` `Any` pool, so a
//!   `postgres://` or `sqlite://` URL selects the backend.
//!
//! ## Public API
//!
//! - `ConnectionDescriptor`: how to reach the database, derived from config.
//! - `Database`: the live handle with `ping`, `with_transaction` and `close`.
//! - `UserRepository`: queries for the `users` table.
//! - `DbError` / `TransactionError`: the errors returned by this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod resource;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{ConnectionDescriptor, ConnectionFields, PoolSettings, SslMode};
pub use error::{DbError, TransactionError};
pub use repository::UserRepository;
pub use resource::Database;
