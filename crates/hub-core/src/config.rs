//! Centralized configuration for the hub.
//!
//! Compile-time constants live in unit structs; deployment settings are read
//! from the environment by [`HubSettings::from_env`].

use crate::error::{HubError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// SQLite connection tuning.
pub struct DatabaseConfig;

impl DatabaseConfig {
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_PATH: &'static str = "/tmp/tackle.db";
}

/// Seeding keys and defaults.
pub struct SeedConfig;

impl SeedConfig {
    /// Setting holding the hex checksum of the last applied bundle.
    pub const SEED_KEY: &'static str = ".hub.db.seed";
    /// Setting holding the build string that last seeded.
    pub const BUILD_KEY: &'static str = ".hub.db.seed.build";
    /// Setting holding the UI ordering of targets.
    pub const TARGET_ORDER_KEY: &'static str = "ui.target.order";
    /// Setting holding the UI ordering of rule sets.
    pub const RULESET_ORDER_KEY: &'static str = "ui.ruleset.order";
    pub const DEFAULT_PATH: &'static str = "/tmp/seed";
    pub const EXTENSIONS: [&'static str; 3] = ["yaml", "yml", "json"];
}

/// Stored file locations.
pub struct BucketConfig;

impl BucketConfig {
    pub const DEFAULT_PATH: &'static str = "/tmp/bucket";
    pub const FILES_DIR_NAME: &'static str = "files";
}

/// Environment variable names.
pub struct EnvConfig;

impl EnvConfig {
    pub const DB_PATH: &'static str = "DB_PATH";
    pub const DB_SEED_PATH: &'static str = "DB_SEED_PATH";
    pub const BUCKET_PATH: &'static str = "BUCKET_PATH";
    pub const BUILD: &'static str = "BUILD";
}

/// Deployment settings.
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Directory holding the seed bundle.
    pub seed_path: PathBuf,
    /// Root of stored files.
    pub bucket_path: PathBuf,
    /// Build string; a new build forces reseeding.
    pub build: String,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DatabaseConfig::DEFAULT_PATH),
            seed_path: PathBuf::from(SeedConfig::DEFAULT_PATH),
            bucket_path: PathBuf::from(BucketConfig::DEFAULT_PATH),
            build: String::new(),
        }
    }
}

impl HubSettings {
    /// Load settings from environment variables.
    ///
    /// Optional (with defaults):
    /// - `DB_PATH`: database file (default: `/tmp/tackle.db`)
    /// - `DB_SEED_PATH`: seed directory (default: `/tmp/seed`)
    /// - `BUCKET_PATH`: stored files root (default: `/tmp/bucket`)
    /// - `BUILD`: build string (default: empty)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(path) = lookup(EnvConfig::DB_PATH) {
            settings.db_path = non_empty_path(EnvConfig::DB_PATH, path)?;
        }
        if let Some(path) = lookup(EnvConfig::DB_SEED_PATH) {
            settings.seed_path = non_empty_path(EnvConfig::DB_SEED_PATH, path)?;
        }
        if let Some(path) = lookup(EnvConfig::BUCKET_PATH) {
            settings.bucket_path = non_empty_path(EnvConfig::BUCKET_PATH, path)?;
        }
        if let Some(build) = lookup(EnvConfig::BUILD) {
            settings.build = build;
        }
        Ok(settings)
    }

    /// Directory holding stored file content.
    pub fn files_dir(&self) -> PathBuf {
        self.bucket_path.join(BucketConfig::FILES_DIR_NAME)
    }
}

fn non_empty_path(key: &str, value: String) -> Result<PathBuf> {
    if value.trim().is_empty() {
        return Err(HubError::Config {
            message: format!("{} must not be empty", key),
        });
    }
    Ok(PathBuf::from(value))
}
