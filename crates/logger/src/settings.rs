use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use configuration::ConfigStore;

/// Where the file sink writes and how long segments are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub folder: PathBuf,
    pub prefix: String,
    /// Maximum number of segments kept, the current one included.
    pub max_backups: Option<usize>,
    /// Segments whose day ended longer ago than this are removed.
    pub max_age: Option<TimeDelta>,
    /// Maintain `<folder>/<prefix>.log` pointing at the current segment.
    pub link: bool,
}

impl LogSettings {
    pub const DEFAULT_FOLDER: &'static str = "logs";
    pub const DEFAULT_PREFIX: &'static str = "app";

    pub fn new(folder: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            prefix: prefix.into(),
            max_backups: None,
            max_age: None,
            link: true,
        }
    }

    /// Reads the `log.*` keys. Retention limits only apply when set to a
    /// positive value; `log.maxAge` is in days.
    pub fn from_config(config: &ConfigStore) -> Self {
        let folder = non_empty(config.get_string("log.logFolder"), Self::DEFAULT_FOLDER);
        let prefix = non_empty(config.get_string("log.logPrefix"), Self::DEFAULT_PREFIX);

        let mut settings = Self::new(folder, prefix);
        if let Ok(count) = usize::try_from(config.get_int("log.maxBackups")) {
            if count > 0 {
                settings.max_backups = Some(count);
            }
        }
        let days = config.get_int("log.maxAge");
        if days > 0 {
            settings.max_age = TimeDelta::try_days(days);
        }
        settings.link = !config.get_bool("log.disableLink");
        settings
    }

    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = Some(count).filter(|count| *count > 0);
        self
    }

    pub fn with_max_age(mut self, age: TimeDelta) -> Self {
        self.max_age = Some(age).filter(|age| *age > TimeDelta::zero());
        self
    }

    pub fn without_link(mut self) -> Self {
        self.link = false;
        self
    }

    pub fn link_path(&self) -> PathBuf {
        self.folder.join(format!("{}.log", self.prefix))
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

fn non_empty(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn config(contents: &str) -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, contents).unwrap();
        let store = ConfigStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn reads_log_section() {
        let (_dir, store) = config(
            r#"{ "log": { "logFolder": "var/log", "logPrefix": "nodelab", "maxBackups": 7, "maxAge": 30 } }"#,
        );
        let settings = LogSettings::from_config(&store);

        assert_eq!(settings.folder, PathBuf::from("var/log"));
        assert_eq!(settings.prefix, "nodelab");
        assert_eq!(settings.max_backups, Some(7));
        assert_eq!(settings.max_age, TimeDelta::try_days(30));
        assert!(settings.link);
        assert_eq!(settings.link_path(), PathBuf::from("var/log/nodelab.log"));
    }

    #[test]
    fn unset_limits_mean_unlimited() {
        let (_dir, store) = config(r#"{ "log": { "maxBackups": 0, "maxAge": -1 } }"#);
        let settings = LogSettings::from_config(&store);

        assert_eq!(settings.folder, PathBuf::from(LogSettings::DEFAULT_FOLDER));
        assert_eq!(settings.prefix, LogSettings::DEFAULT_PREFIX);
        assert_eq!(settings.max_backups, None);
        assert_eq!(settings.max_age, None);
    }

    #[test]
    fn link_can_be_disabled() {
        let (_dir, store) = config(r#"{ "log": { "disableLink": true } }"#);
        assert!(!LogSettings::from_config(&store).link);
    }
}
