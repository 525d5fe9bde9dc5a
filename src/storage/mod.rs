//! Durable local key-value store and the persistence adapter on top of it.
//!
//! Two records are kept:
//!
//! - `"contentSamples"`: the full sample list, as one JSON array
//! - `"apiConfig"`: the [`ApiConfiguration`] record
//!
//! The adapter never fails past its boundary. Loads fall back to the
//! documented default when a record is missing, unreadable or malformed.
//! Saves are synchronous write-through; a failed save is reported on stderr
//! and otherwise ignored, so the tool stays usable on a broken disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::llm::config::ApiConfiguration;
use crate::samples::ContentSample;

/// Record holding the sample list.
pub const SAMPLES_KEY: &str = "contentSamples";

/// Record holding the API configuration.
pub const API_CONFIG_KEY: &str = "apiConfig";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A string-to-string store with durable `set`.
pub trait KeyValueStore {
    /// Raw text stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the text stored under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One file per key (`<dir>/<key>.json`).
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` as the store root. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the records live.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        // Write-then-rename so a crash never leaves a half-written record.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store, used by tests and throw-away sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Load and decode the record under `key`.
///
/// Returns `None` when the record is absent, unreadable or does not decode.
pub fn load<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key).ok()??;
    serde_json::from_str(&raw).ok()
}

/// Encode `value` and write it under `key`, reporting (not returning) failures.
pub fn save<T: Serialize + ?Sized>(store: &mut impl KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .context("failed to encode record")
        .and_then(|json| store.set(key, &json));

    if let Err(e) = result {
        eprintln!(
            "{} could not save '{key}': {e:#}",
            "warning:".yellow().bold()
        );
    }
}

/// The persisted sample list, or an empty list.
pub fn load_samples(store: &impl KeyValueStore) -> Vec<ContentSample> {
    load(store, SAMPLES_KEY).unwrap_or_default()
}

pub fn save_samples(store: &mut impl KeyValueStore, samples: &[ContentSample]) {
    save(store, SAMPLES_KEY, samples);
}

/// The persisted API configuration, or the default triple.
pub fn load_api_config(store: &impl KeyValueStore) -> ApiConfiguration {
    load(store, API_CONFIG_KEY).unwrap_or_default()
}

pub fn save_api_config(store: &mut impl KeyValueStore, config: &ApiConfiguration) {
    save(store, API_CONFIG_KEY, config);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
