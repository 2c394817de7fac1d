//! # Nodelab Configuration Crate
//!
//! A thread-safe key/value view over a single JSON configuration file.
//!
//! Keys are dotted paths into the document (`database.host`, `log.maxAge`).
//! Typed getters never fail: a missing or unconvertible value yields the zero
//! value of the requested type. Writes go through [`ConfigStore::set`], which
//! persists the whole document back to its source file before the new value
//! becomes visible to readers.

// Declare the modules that make up this crate.
pub mod coerce;
pub mod error;
pub mod store;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use store::ConfigStore;
