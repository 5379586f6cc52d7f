//! Value cache - per-resource key/value state persisted between runs
//!
//! The harness records when a resource was last checked and synced, and
//! the last observed value of every audited attribute. Each `get`/`set` is
//! atomic; there are no multi-key transactions, so concurrent evaluation of
//! the same resource identity is not supported. Different identities may be
//! evaluated concurrently.

use crate::value::{Value, Values};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Cache key holding the time of the last evaluation attempt
pub const CHECKED: &str = "checked";

/// Cache key holding the time changes were last applied
pub const SYNCED: &str = "synced";

/// Key/value store keyed by resource identity
pub trait ValueCache: Send + Sync {
    fn get(&self, resource: &str, key: &str) -> Option<Value>;

    fn set(&self, resource: &str, key: &str, value: Value);

    /// Copy of every value cached for a resource
    fn snapshot(&self, resource: &str) -> Values;
}

// ============================================================================
// In-memory cache
// ============================================================================

/// Mutex-guarded in-memory cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<String, Values>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_entries(entries: BTreeMap<String, Values>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Values>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resource identities with cached values, sorted
    pub fn resources(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Drop everything cached for a resource; returns whether it existed
    pub fn forget(&self, resource: &str) -> bool {
        self.lock().remove(resource).is_some()
    }
}

impl ValueCache for MemoryCache {
    fn get(&self, resource: &str, key: &str) -> Option<Value> {
        self.lock().get(resource).and_then(|v| v.get(key)).cloned()
    }

    fn set(&self, resource: &str, key: &str, value: Value) {
        self.lock()
            .entry(resource.to_string())
            .or_default()
            .insert(key.to_string(), storable(value));
    }

    fn snapshot(&self, resource: &str) -> Values {
        self.lock().get(resource).cloned().unwrap_or_default()
    }
}

/// JSON has no NaN or infinity; keep such floats as their text form
fn storable(value: Value) -> Value {
    match value {
        Value::Float(f) if !f.is_finite() => Value::String(f.to_string()),
        Value::List(items) => Value::List(items.into_iter().map(storable).collect()),
        other => other,
    }
}

// ============================================================================
// File-backed cache
// ============================================================================

/// Cache persisted as a JSON document
///
/// Loaded once, kept in memory during the run and written back with
/// [`FileCache::save`].
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    inner: MemoryCache,
}

impl FileCache {
    /// Load the cache from disk, or start empty if the file doesn't exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            log::debug!("Cache file {} does not exist, starting empty", path.display());
            return Ok(Self {
                path,
                inner: MemoryCache::new(),
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
        let entries: BTreeMap<String, Values> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;

        log::debug!(
            "Loaded {} cached resources from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            path,
            inner: MemoryCache::from_entries(entries),
        })
    }

    /// Write the cache back to disk
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        }

        let content = {
            let entries = self.inner.lock();
            serde_json::to_string_pretty(&*entries).context("Failed to serialize cache")?
        };

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))?;

        log::debug!("Saved cache to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resources(&self) -> Vec<String> {
        self.inner.resources()
    }

    pub fn forget(&self, resource: &str) -> bool {
        self.inner.forget(resource)
    }
}

impl ValueCache for FileCache {
    fn get(&self, resource: &str, key: &str) -> Option<Value> {
        self.inner.get(resource, key)
    }

    fn set(&self, resource: &str, key: &str, value: Value) {
        self.inner.set(resource, key, value);
    }

    fn snapshot(&self, resource: &str) -> Values {
        self.inner.snapshot(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("File[/a]", "mode"), None);

        cache.set("File[/a]", "mode", Value::from("0644"));
        cache.set("File[/b]", "mode", Value::from("0600"));
        assert_eq!(cache.get("File[/a]", "mode"), Some(Value::from("0644")));

        let snapshot = cache.snapshot("File[/a]");
        cache.set("File[/a]", "mode", Value::from("0755"));
        assert_eq!(snapshot.get("mode"), Some(&Value::from("0644")));

        assert_eq!(cache.resources(), vec!["File[/a]", "File[/b]"]);
        assert!(cache.forget("File[/a]"));
        assert!(!cache.forget("File[/a]"));
        assert!(cache.snapshot("File[/a]").is_empty());
    }

    #[test]
    fn test_file_cache_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::load(dir.path().join("cache.json")).unwrap();
        assert!(cache.resources().is_empty());
    }

    #[test]
    fn test_file_cache_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let checked = Utc.timestamp_opt(1_700_000_000, 5_000).unwrap();

        let cache = FileCache::load(&path).unwrap();
        cache.set("Service[sshd]", CHECKED, Value::from(checked));
        cache.set("Service[sshd]", "enable", Value::from(true));
        cache.save().unwrap();

        let reloaded = FileCache::load(&path).unwrap();
        assert_eq!(reloaded.path(), path.as_path());
        assert_eq!(reloaded.resources(), vec!["Service[sshd]"]);
        assert_eq!(
            reloaded.get("Service[sshd]", CHECKED),
            Some(Value::from(checked))
        );
        assert_eq!(
            reloaded.get("Service[sshd]", "enable"),
            Some(Value::from(true))
        );
    }

    #[test]
    fn test_non_finite_floats_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = FileCache::load(&path).unwrap();
        cache.set("Exec[x]", "load", Value::Float(f64::NAN));
        cache.set(
            "Exec[x]",
            "samples",
            Value::List(vec![Value::Float(1.5), Value::Float(f64::INFINITY)]),
        );
        cache.save().unwrap();

        let reloaded = FileCache::load(&path).unwrap();
        assert_eq!(reloaded.get("Exec[x]", "load"), Some(Value::from("NaN")));
        assert_eq!(
            reloaded.get("Exec[x]", "samples"),
            Some(Value::List(vec![Value::Float(1.5), Value::from("inf")]))
        );
    }

    #[test]
    fn test_file_cache_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();

        let err = FileCache::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse cache file"));
    }
}
