//! JSON file cache for data fetched from the library.
//!
//! Each key lives in `cached_<key>.json` inside the cache directory, together
//! with the Unix time it was written. Entries older than the configured
//! maximum age, and files that cannot be read or decoded, count as missing.

use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One day, the default freshness window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Serialize, Deserialize)]
struct Entry<T> {
    timestamp: u64,
    data: T,
}

/// A directory of timestamped JSON cache files.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    max_age: Duration,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("cached_{key}.json"))
    }

    /// Cached value for `key`, if present and fresh.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        debug!("Attempting {key} from cache {}", path.display());

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!("Cannot read cache file ({err}), ignoring cache");
                return None;
            }
        };

        let entry: Entry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Cannot decode cache file ({err}), ignoring cache");
                return None;
            }
        };

        if is_outdated(entry.timestamp, self.max_age) {
            debug!("Cached {key} is older than {:?}, ignoring cache", self.max_age);
            return None;
        }

        debug!("Got cached {key}");
        Some(entry.data)
    }

    /// Write `data` under `key`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file cannot be
    /// written.
    pub fn store<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        debug!("Storing {key} in cache");
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create cache directory {}", self.dir.display())
        })?;

        let entry = Entry {
            timestamp: unix_now(),
            data,
        };
        let path = self.path_for(key);
        let json = serde_json::to_string(&entry).context("Failed to encode cache entry")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache file {}", path.display()))
    }

    /// Cached value for `key`, or the result of `produce`, which is then
    /// stored.
    ///
    /// # Errors
    ///
    /// Propagates errors from `produce` and from writing the cache.
    pub fn get_or_insert_with<T, F>(&self, key: &str, produce: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(cached) = self.get(key) {
            return Ok(cached);
        }

        let data = produce()?;
        self.store(key, &data)?;
        Ok(data)
    }

    /// Forget `key`. Missing entries are not an error.
    ///
    /// # Errors
    ///
    /// Fails if an existing cache file cannot be removed.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Invalidated cached {key}");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove cache file {}", path.display())),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// True when a cache entry written at `timestamp` is older than `max_age`.
#[must_use]
pub fn is_outdated(timestamp: u64, max_age: Duration) -> bool {
    unix_now().saturating_sub(timestamp) > max_age.as_secs()
}
