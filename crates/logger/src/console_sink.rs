use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};

use crate::level::LogLevel;

/// Prints `[YYYY-MM-DD HH:MM:SS] LEVEL: message`, colored by level.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    colors: bool,
}

impl ConsoleSink {
    /// Standard output, colored when the terminal supports it.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), console::colors_enabled())
    }

    pub fn new(out: impl Write + Send + 'static, colors: bool) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            colors,
        }
    }

    pub fn print(&self, level: LogLevel, now: DateTime<Local>, message: &str) {
        let line = format!(
            "[{}] {}: {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            level.label(),
            message
        );
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let written = if self.colors {
            writeln!(out, "{}", level.style().force_styling(true).apply_to(line))
        } else {
            writeln!(out, "{line}")
        };
        if let Err(err) = written.and_then(|()| out.flush()) {
            tracing::warn!(error = %err, "failed to write log record to console");
        }
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("colors", &self.colors)
            .finish_non_exhaustive()
    }
}
