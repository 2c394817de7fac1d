use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::coerce;
use crate::error::ConfigError;

/// The process-wide configuration, loaded once from a JSON file.
///
/// Reads take a shared lock and writes an exclusive one, so a reader never
/// observes a document that is halfway through an update. The store is meant
/// to be created at startup and handed to the components that need it.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: RwLock<Value>,
}

impl ConfigStore {
    /// Location of the config file relative to the working directory.
    pub const DEFAULT_PATH: &'static str = "config/config.json";

    /// Reads and parses the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let document: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        if !document.is_object() {
            return Err(ConfigError::NotAnObject(path));
        }

        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    /// The file this store was loaded from and writes back to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of the raw value at `key`, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_with(key, Value::clone)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read_with(key, |_| ()).is_some()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.read_with(key, coerce::to_string).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.read_with(key, coerce::to_i64).unwrap_or_default()
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.read_with(key, coerce::to_f64).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.read_with(key, coerce::to_bool).unwrap_or_default()
    }

    /// Updates `key` and saves the whole document back to the source file.
    ///
    /// The new document is written to disk before it is published in memory,
    /// so a failed save leaves both the file and the in-memory store as they
    /// were. Missing intermediate objects are created on the way down.
    pub fn set<V: Serialize>(&self, key: &str, value: V) -> Result<(), ConfigError> {
        let segments = split_key(key)?;
        let value = serde_json::to_value(value)?;

        let mut document = self.write();
        let mut updated = document.clone();
        insert(&mut updated, &segments, value);
        persist(&self.path, &updated)?;
        *document = updated;

        tracing::debug!(key, path = %self.path.display(), "configuration value saved");
        Ok(())
    }

    fn read_with<T>(&self, key: &str, f: impl FnOnce(&Value) -> T) -> Option<T> {
        let document = self.read();
        lookup(&document, key).map(f)
    }

    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.document.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.document.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn split_key(key: &str) -> Result<Vec<&str>, ConfigError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(document, |node, segment| child(node.as_object()?, segment))
}

/// Exact match first, then a case-insensitive one.
fn child<'a>(map: &'a Map<String, Value>, segment: &str) -> Option<&'a Value> {
    map.get(segment).or_else(|| {
        map.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(segment))
            .map(|(_, value)| value)
    })
}

fn resolve_name(map: &Map<String, Value>, segment: &str) -> String {
    if map.contains_key(segment) {
        return segment.to_string();
    }
    map.keys()
        .find(|name| name.eq_ignore_ascii_case(segment))
        .cloned()
        .unwrap_or_else(|| segment.to_string())
}

fn insert(document: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = document;
    for segment in parents {
        let map = ensure_object(node);
        let name = resolve_name(map, segment);
        node = map
            .entry(name)
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let map = ensure_object(node);
    let name = resolve_name(map, last);
    map.insert(name, value);
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was replaced with an object above"),
    }
}

/// Writes to a temp file in the same folder, syncs it, then renames it over
/// the target. The temp file is removed if any step fails.
fn persist(path: &Path, document: &Value) -> Result<(), ConfigError> {
    let mut rendered = serde_json::to_string_pretty(document)?;
    rendered.push('\n');

    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let failed = |source: std::io::Error| ConfigError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let mut file = NamedTempFile::new_in(folder).map_err(failed)?;
    file.write_all(rendered.as_bytes()).map_err(failed)?;
    file.as_file().sync_all().map_err(failed)?;
    file.persist(path).map_err(|e| failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with(contents: &Value) -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, serde_json::to_string(contents).unwrap()).unwrap();
        let store = ConfigStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn reads_nested_values_through_dotted_keys() {
        let (_dir, store) = store_with(&json!({
            "database": { "host": "db.local", "port": 5432, "sslmode": true },
            "log": { "logFolder": "logs" }
        }));

        assert_eq!(store.get_string("database.host"), "db.local");
        assert_eq!(store.get_int("database.port"), 5432);
        assert!(store.get_bool("database.sslmode"));
        assert_eq!(store.get_string("log.logFolder"), "logs");
    }

    #[test]
    fn key_segments_fall_back_to_case_insensitive_match() {
        let (_dir, store) = store_with(&json!({ "log": { "logFolder": "logs" } }));
        assert_eq!(store.get_string("log.logfolder"), "logs");
        assert_eq!(store.get_string("LOG.LOGFOLDER"), "logs");
    }

    #[test]
    fn missing_keys_yield_zero_values() {
        let (_dir, store) = store_with(&json!({ "database": {} }));

        assert_eq!(store.get_string("database.host"), "");
        assert_eq!(store.get_int("database.port"), 0);
        assert_eq!(store.get_float("database.ratio"), 0.0);
        assert!(!store.get_bool("database.sslmode"));
        assert!(!store.contains("database.host"));
        assert!(store.contains("database"));
    }

    #[test]
    fn set_is_visible_and_written_back() {
        let (_dir, store) = store_with(&json!({ "database": { "host": "a" } }));

        store.set("database.host", "b").unwrap();
        store.set("database.port", 6543).unwrap();

        assert_eq!(store.get_string("database.host"), "b");
        assert_eq!(store.get_int("database.port"), 6543);

        let reloaded = ConfigStore::load(store.path()).unwrap();
        assert_eq!(reloaded.get_string("database.host"), "b");
        assert_eq!(reloaded.get_int("database.port"), 6543);
    }

    #[test]
    fn set_creates_missing_parents_and_replaces_scalars() {
        let (_dir, store) = store_with(&json!({ "feature": "off" }));

        store.set("feature.flags.beta", true).unwrap();
        store.set("new.section.value", 1.5).unwrap();

        assert!(store.get_bool("feature.flags.beta"));
        assert_eq!(store.get_float("new.section.value"), 1.5);
    }

    #[test]
    fn set_keeps_existing_key_spelling() {
        let (_dir, store) = store_with(&json!({ "log": { "logFolder": "logs" } }));

        store.set("log.logfolder", "other").unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let document: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(document["log"]["logFolder"], "other");
        assert!(document["log"].get("logfolder").is_none());
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let (_dir, store) = store_with(&json!({}));
        assert!(matches!(store.set("", 1), Err(ConfigError::InvalidKey(_))));
        assert!(matches!(store.set("a..b", 1), Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn failed_save_leaves_memory_untouched() {
        let (dir, store) = store_with(&json!({ "k": "before" }));
        drop(dir);

        let err = store.set("k", "after").unwrap_err();
        assert!(matches!(err, ConfigError::Persist { .. }));
        assert_eq!(store.get_string("k"), "before");
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let (dir, store) = store_with(&json!({}));

        store.set("a.b", 1).unwrap();
        store.set("a.c", "two").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.json")]);
    }

    #[test]
    fn non_object_documents_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(
            ConfigStore::load(&path),
            Err(ConfigError::NotAnObject(_))
        ));
    }

    #[test]
    fn unreadable_and_malformed_files_fail_to_load() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ConfigStore::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            ConfigStore::load(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }
}
