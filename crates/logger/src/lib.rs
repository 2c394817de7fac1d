//! # Nodelab Logger
//!
//! The application-facing logger. Every record goes to two sinks:
//!
//! - a file sink that rolls over to a new dated segment
//!   (`<folder>/<prefix>.%Y-%m-%d.log`) each day, keeps an optional
//!   `<prefix>.log` link pointing at the current segment, and prunes old
//!   segments by count and/or age;
//! - a console sink that prints a colored, timestamped line synchronously.
//!
//! Three levels exist: info, error and success. Each has a plain variant that
//! takes a [`Message`] and a formatted variant that takes `format_args!`.
//!
//! This logger is separate from the `tracing` diagnostics the platform crates
//! emit internally; it is constructed once and passed to whoever needs it.

// Declare the modules that make up this crate.
pub mod clock;
pub mod console_sink;
pub mod error;
pub mod level;
pub mod logger;
pub mod message;
pub mod rotate;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use clock::{Clock, SystemClock};
pub use console_sink::ConsoleSink;
pub use error::LoggerError;
pub use level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use message::{LogArg, Message, Structured};
pub use rotate::RotatingFile;
pub use settings::LogSettings;
