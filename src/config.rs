//! Loader configuration.

use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Length of the truncated hex digest used as an artifact file name.
pub const DEFAULT_KEY_LENGTH: usize = 16;

/// Default cache location, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".boundary/client";

/// Configuration for the boundary loader and its JS host
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Project root; relative cache paths and sandbox access are anchored here
    pub project_root: PathBuf,
    /// Directory holding stripped client artifacts (relative to `project_root` unless absolute)
    pub cache_dir: PathBuf,
    /// Hex characters kept from the SHA-256 digest (1..=64)
    pub key_length: usize,
    /// File extensions scanned for component exports
    pub component_extensions: Vec<String>,
    /// File extensions the JS host may import
    pub module_extensions: Vec<String>,
    /// Maximum V8 heap size in bytes (None = unlimited)
    pub max_heap_size: Option<usize>,
    /// Maximum time for a single module evaluation in milliseconds (None = unlimited)
    pub timeout_ms: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            key_length: DEFAULT_KEY_LENGTH,
            component_extensions: vec!["tsx".into(), "jsx".into()],
            module_extensions: vec!["js".into(), "mjs".into()],
            max_heap_size: Some(64 * 1024 * 1024), // 64MB default
            timeout_ms: Some(30_000),
        }
    }
}

impl LoaderConfig {
    /// Config rooted at `project_root` with every other field defaulted.
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// Read a JSON config file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LoaderError::config(path, e))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| LoaderError::config(path, e))?;
        config
            .validate()
            .map_err(|message| LoaderError::config(path, message))?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.key_length == 0 || self.key_length > 64 {
            return Err(format!("key_length must be within 1..=64, got {}", self.key_length));
        }
        Ok(())
    }

    /// Absolute cache directory.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            self.project_root.join(&self.cache_dir)
        }
    }
}
