//! Daily rotating file sink.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, TimeDelta};

use crate::error::LoggerError;
use crate::settings::LogSettings;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug)]
struct Segment {
    date: NaiveDate,
    path: PathBuf,
    file: File,
}

/// Appends to `<folder>/<prefix>.<date>.log`, switching files when the local
/// date changes.
///
/// After each switch the link is refreshed and segments beyond the configured
/// count or age are deleted. The segment being written is never deleted.
#[derive(Debug)]
pub struct RotatingFile {
    settings: LogSettings,
    current: Segment,
}

impl RotatingFile {
    /// Opens the segment for `now`. The folder must already exist.
    pub fn open(settings: LogSettings, now: DateTime<Local>) -> Result<Self, LoggerError> {
        let date = now.date_naive();
        let path = segment_path(&settings, date);
        let file = open_append(&path).map_err(|source| LoggerError::OpenSegment {
            path: path.clone(),
            source,
        })?;

        let rotating = Self {
            settings,
            current: Segment { date, path, file },
        };
        rotating.after_switch(now);
        Ok(rotating)
    }

    /// Path of the segment currently written to.
    pub fn current_path(&self) -> &Path {
        &self.current.path
    }

    /// Writes `bytes` to the segment for `now`, rolling over first if needed.
    pub fn write_record(&mut self, now: DateTime<Local>, bytes: &[u8]) -> io::Result<()> {
        self.roll_to(now)?;
        self.current.file.write_all(bytes)
    }

    fn roll_to(&mut self, now: DateTime<Local>) -> io::Result<()> {
        let date = now.date_naive();
        if date == self.current.date {
            return Ok(());
        }

        let path = segment_path(&self.settings, date);
        let file = open_append(&path)?;
        tracing::debug!(from = %self.current.path.display(), to = %path.display(), "rotating log file");
        self.current = Segment { date, path, file };
        self.after_switch(now);
        Ok(())
    }

    fn after_switch(&self, now: DateTime<Local>) {
        if self.settings.link {
            if let Err(err) = self.update_link() {
                tracing::warn!(error = %err, link = %self.settings.link_path().display(), "failed to update log link");
            }
        }
        if let Err(err) = self.prune(now) {
            tracing::warn!(error = %err, folder = %self.settings.folder.display(), "failed to prune old log files");
        }
    }

    #[cfg(unix)]
    fn update_link(&self) -> io::Result<()> {
        let link = self.settings.link_path();
        let tmp = self
            .settings
            .folder
            .join(format!(".{}.log.tmp", self.settings.prefix));
        let target = self
            .current
            .path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "segment has no file name"))?;

        match fs::remove_file(&tmp) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
            _ => {}
        }
        std::os::unix::fs::symlink(target, &tmp)?;
        fs::rename(&tmp, &link)
    }

    #[cfg(not(unix))]
    fn update_link(&self) -> io::Result<()> {
        Ok(())
    }

    /// Segments in the folder, newest first.
    fn segments(&self) -> io::Result<Vec<(NaiveDate, PathBuf)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.settings.folder)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(date) = segment_date(&self.settings.prefix, name) {
                found.push((date, entry.path()));
            }
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(found)
    }

    fn prune(&self, now: DateTime<Local>) -> io::Result<()> {
        if self.settings.max_age.is_none() && self.settings.max_backups.is_none() {
            return Ok(());
        }

        let mut kept = Vec::new();
        for (date, path) in self.segments()? {
            if path == self.current.path {
                continue;
            }
            if self
                .settings
                .max_age
                .is_some_and(|max_age| expired(date, max_age, now))
            {
                remove_segment(&path);
            } else {
                kept.push(path);
            }
        }

        if let Some(max_backups) = self.settings.max_backups {
            // The current segment takes one of the slots.
            let keep = max_backups.saturating_sub(1);
            for path in kept.iter().skip(keep) {
                remove_segment(path);
            }
        }
        Ok(())
    }
}

pub(crate) fn segment_path(settings: &LogSettings, date: NaiveDate) -> PathBuf {
    settings
        .folder
        .join(format!("{}.{}.log", settings.prefix, date.format(DATE_FORMAT)))
}

fn segment_date(prefix: &str, file_name: &str) -> Option<NaiveDate> {
    let date = file_name
        .strip_prefix(prefix)?
        .strip_prefix('.')?
        .strip_suffix(".log")?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// A segment covers one whole day; it expires once that day ended more than
/// `max_age` ago.
fn expired(date: NaiveDate, max_age: TimeDelta, now: DateTime<Local>) -> bool {
    let Some(day_end) = date.succ_opt().and_then(|next| next.and_hms_opt(0, 0, 0)) else {
        return false;
    };
    day_end
        .checked_add_signed(max_age)
        .is_some_and(|deadline| deadline <= now.naive_local())
}

fn remove_segment(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed old log file"),
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "failed to remove old log file"),
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap()
    }

    #[test]
    fn segment_names_use_the_date() {
        let settings = LogSettings::new("logs", "app");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            segment_path(&settings, date),
            PathBuf::from("logs/app.2024-03-09.log")
        );
    }

    #[test]
    fn only_matching_names_are_segments() {
        assert_eq!(
            segment_date("app", "app.2024-03-09.log"),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert_eq!(segment_date("app", "app.log"), None);
        assert_eq!(segment_date("app", "other.2024-03-09.log"), None);
        assert_eq!(segment_date("app", "app.2024-03-09.log.gz"), None);
        assert_eq!(segment_date("app", "application.2024-03-09.log"), None);
    }

    #[test]
    fn segments_expire_after_their_day_plus_max_age() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let two_days = TimeDelta::try_days(2).unwrap();

        assert!(!expired(day, two_days, at(2024, 3, 11, 23)));
        assert!(expired(day, two_days, at(2024, 3, 12, 0)));
        assert!(expired(day, two_days, at(2024, 3, 20, 8)));
    }

    #[test]
    fn huge_max_age_never_expires() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let forever = TimeDelta::try_days(100_000_000).unwrap();

        assert!(!expired(day, forever, at(2024, 3, 20, 8)));
    }
}
