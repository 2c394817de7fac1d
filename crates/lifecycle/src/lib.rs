//! # Nodelab Lifecycle Crate
//!
//! The registry components use to tie their teardown to the host's shutdown
//! sequence.
//!
//! A component receives a `&mut dyn Lifecycle` in its constructor and appends a
//! [`Hook`]. The host owns the concrete [`Hooks`] container: it runs start
//! hooks once all components are built and stop hooks, in reverse order, when
//! the process shuts down.

pub mod error;
pub mod hooks;

pub use error::{HookError, LifecycleError};
pub use hooks::{Hook, HookFn, Hooks, Lifecycle};
