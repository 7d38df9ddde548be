//! Configuration for blockarc
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

/// File extension every archive container carries
pub const ARCHIVE_EXTENSION: &str = "arc";

/// Main configuration for an archive handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Container Configuration
    // -------------------------------------------------------------------------
    /// Caller-supplied container name. The `.arc` suffix is appended by
    /// [`Config::archive_path`] when missing.
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// When to fsync the backing file
    pub sync_strategy: SyncStrategy,
}

/// Sync strategy for the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Sync only when the handle is closed
    OnClose,

    /// Sync after every mutating operation (add, remove, compact)
    EveryOperation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("archive"),
            sync_strategy: SyncStrategy::OnClose,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Config for the given container name, defaults elsewhere
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self::builder().path(path).build()
    }

    /// Full container path, with the `.arc` suffix applied
    ///
    /// "backup" → "backup.arc", "backup.arc" → "backup.arc"
    pub fn archive_path(&self) -> PathBuf {
        with_archive_extension(&self.path)
    }
}

fn with_archive_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == ARCHIVE_EXTENSION => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_os_string();
            name.push(".");
            name.push(ARCHIVE_EXTENSION);
            PathBuf::from(name)
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the container name (with or without the `.arc` suffix)
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
