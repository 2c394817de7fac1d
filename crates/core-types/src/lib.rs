//! # Nodelab Core Types
//!
//! Plain record definitions shared by the platform crates. These are the rows
//! the application stores through the `database` crate; they carry their own
//! validation rules but know nothing about SQL.

pub mod error;
pub mod user;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use user::{NewUser, User};
