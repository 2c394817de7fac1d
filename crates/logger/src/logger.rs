use std::fmt;
use std::fs;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use configuration::ConfigStore;

use crate::clock::{Clock, SystemClock};
use crate::console_sink::ConsoleSink;
use crate::error::LoggerError;
use crate::level::LogLevel;
use crate::message::Message;
use crate::rotate::RotatingFile;
use crate::settings::LogSettings;

/// Multi-level logger writing to a rotating file and the console.
///
/// Each call formats the message once, appends the file line, then prints the
/// console line, all on the calling thread. A failed file write is reported
/// through `tracing` and does not stop the console line.
///
/// The recorded source location is the caller's: every public logging method
/// and the shared dispatch helper are `#[track_caller]`.
#[derive(Debug)]
pub struct Logger {
    file: Mutex<RotatingFile>,
    console: ConsoleSink,
    clock: Arc<dyn Clock>,
}

/// Builds a [`Logger`] with a non-default console or clock.
#[derive(Debug)]
pub struct LoggerBuilder {
    settings: LogSettings,
    console: Option<ConsoleSink>,
    clock: Arc<dyn Clock>,
}

impl LoggerBuilder {
    pub fn new(settings: LogSettings) -> Self {
        Self {
            settings,
            console: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn console(mut self, console: ConsoleSink) -> Self {
        self.console = Some(console);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates the log folder if needed and opens today's segment.
    pub fn build(self) -> Result<Logger, LoggerError> {
        fs::create_dir_all(&self.settings.folder).map_err(|source| LoggerError::CreateDir {
            path: self.settings.folder.clone(),
            source,
        })?;

        let file = RotatingFile::open(self.settings, self.clock.now())?;
        Ok(Logger {
            file: Mutex::new(file),
            console: self.console.unwrap_or_else(ConsoleSink::stdout),
            clock: self.clock,
        })
    }
}

impl Logger {
    pub fn builder(settings: LogSettings) -> LoggerBuilder {
        LoggerBuilder::new(settings)
    }

    pub fn new(settings: LogSettings) -> Result<Self, LoggerError> {
        LoggerBuilder::new(settings).build()
    }

    /// Builds a logger from the `log.*` section of the config.
    pub fn from_config(config: &ConfigStore) -> Result<Self, LoggerError> {
        Self::new(LogSettings::from_config(config))
    }

    /// Path of the segment currently being written.
    pub fn current_file(&self) -> PathBuf {
        self.lock_file().current_path().to_path_buf()
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<Message>) {
        self.dispatch(LogLevel::Info, message.into());
    }

    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Info, Message::from(args));
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<Message>) {
        self.dispatch(LogLevel::Error, message.into());
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Error, Message::from(args));
    }

    #[track_caller]
    pub fn success(&self, message: impl Into<Message>) {
        self.dispatch(LogLevel::Success, message.into());
    }

    #[track_caller]
    pub fn successf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Success, Message::from(args));
    }

    #[track_caller]
    fn dispatch(&self, level: LogLevel, message: Message) {
        let location = Location::caller();
        let now = self.clock.now();
        let text = message.render();

        let line = file_line(level, now, location, &text);
        if let Err(err) = self.lock_file().write_record(now, line.as_bytes()) {
            tracing::warn!(error = %err, "failed to write log record to file");
        }

        self.console.print(level, now, &text);
    }

    fn lock_file(&self) -> MutexGuard<'_, RotatingFile> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `LEVEL: YYYY/MM/DD HH:MM:SS file.rs:line: message`
fn file_line(level: LogLevel, now: DateTime<Local>, location: &Location<'_>, text: &str) -> String {
    let mut line = format!(
        "{}{} {}:{}: {}",
        level.file_prefix(),
        now.format("%Y/%m/%d %H:%M:%S"),
        short_file(location.file()),
        location.line(),
        text
    );
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

fn short_file(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
