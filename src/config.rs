//! # Configuration Module
//!
//! Locates tunedup's data and cache directories and bundles the runtime
//! settings the commands need.
//!
//! ## Data Storage
//!
//! The library database lives in the platform-standard data directory:
//! - Linux: `~/.local/share/tunedup/library.db`
//! - macOS: `~/Library/Application Support/tunedup/library.db`
//! - Windows: `%APPDATA%\tunedup\library.db`
//!
//! Cached track lists go to the platform cache directory
//! (`~/.cache/tunedup/` on Linux). Both can be overridden from the command
//! line or through `TUNEDUP_LIBRARY` / `TUNEDUP_CACHE_DIR`.

use crate::cache::DEFAULT_MAX_AGE;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default similarity threshold on the 0–100 scale.
pub const DEFAULT_THRESHOLD: f64 = 90.0;

const APP_DIR: &str = "tunedup";

/// Returns the platform-appropriate data directory for tunedup, creating it
/// if needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the
/// `tunedup` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Pass --library to choose a database explicitly."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create tunedup data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the default library database path.
///
/// # Errors
///
/// See [`get_data_dir`].
///
/// ```no_run
/// let db_path = tunedup::config::get_db_path()?;
/// println!("Library database: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("library.db"))
}

/// Returns the platform cache directory for tunedup. Not created here; the
/// cache creates it on first write.
///
/// # Errors
///
/// Fails if the system cache directory cannot be determined.
pub fn get_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Could not determine system cache directory. Pass --cache-dir to choose one explicitly."
            )
        })
}

/// Configuration for one run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Path to the library database file
    pub db_path: PathBuf,
    /// Directory holding cached track lists
    pub cache_dir: PathBuf,
    /// How long a cached track list stays valid
    pub cache_max_age: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_path: get_db_path().unwrap_or_else(|_| PathBuf::from("library.db")),
            cache_dir: get_cache_dir().unwrap_or_else(|_| PathBuf::from(".")),
            cache_max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl RuntimeConfig {
    /// Platform defaults, failing loudly if a directory cannot be resolved.
    ///
    /// # Errors
    ///
    /// See [`get_db_path`] and [`get_cache_dir`].
    pub fn new() -> Result<Self> {
        Self::resolve(None, None)
    }

    /// Use the given paths where present and platform defaults otherwise.
    /// Default directories are only resolved when needed.
    ///
    /// # Errors
    ///
    /// See [`get_db_path`] and [`get_cache_dir`].
    pub fn resolve(db_path: Option<PathBuf>, cache_dir: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => get_cache_dir()?,
        };

        Ok(Self {
            db_path,
            cache_dir,
            cache_max_age: DEFAULT_MAX_AGE,
        })
    }

    #[must_use]
    pub fn with_db_path(mut self, db_path: PathBuf) -> Self {
        self.db_path = db_path;
        self
    }

    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    #[must_use]
    pub fn with_cache_max_age(mut self, max_age: Duration) -> Self {
        self.cache_max_age = max_age;
        self
    }
}
