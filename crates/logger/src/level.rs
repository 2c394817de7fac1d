use std::fmt;

use console::Style;
use serde::{Deserialize, Serialize};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Error,
    Success,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "SUCCESS",
        }
    }

    /// Prefix written at the start of every file line.
    pub fn file_prefix(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO: ",
            LogLevel::Error => "ERROR: ",
            LogLevel::Success => "SUCCESS: ",
        }
    }

    /// Console color for the level.
    pub fn style(self) -> Style {
        match self {
            LogLevel::Info => Style::new().cyan(),
            LogLevel::Error => Style::new().red(),
            LogLevel::Success => Style::new().green(),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
