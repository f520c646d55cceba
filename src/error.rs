//! Error types for the boundary loader.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by resolution, caching, scanning and loading.
///
/// Nothing here is retried or swallowed locally; every failure reaches the
/// immediate caller.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The requested module does not exist.
    #[error("Module not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A filesystem operation failed (read, write, rename, mkdir, listing).
    #[error("I/O error on '{}': {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The module host failed to load or evaluate the module.
    #[error("Failed to load '{}': {}", path.display(), source)]
    Host {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The configuration file could not be read, parsed or validated.
    #[error("Invalid config '{}': {}", path.display(), source)]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LoaderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Config {
            path: path.into(),
            source: source.into(),
        }
    }

    /// True if this is a missing-module error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = LoaderError> = std::result::Result<T, E>;
