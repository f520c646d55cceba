//! Content-addressed store for stripped client artifacts.
//!
//! Entries are keyed by a digest of (source path, source content) and are
//! immutable once written: a content change yields a new key and leaves the
//! old artifact orphaned.

use crate::config::DEFAULT_KEY_LENGTH;
use crate::error::{LoaderError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Truncated lowercase hex SHA-256 of a module's path and content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the default-length key for `path` and `content`.
pub fn cache_key(path: &Path, content: &str) -> CacheKey {
    cache_key_with_len(path, content, DEFAULT_KEY_LENGTH)
}

/// Derive a key truncated to `len` hex characters (capped at the full digest).
pub fn cache_key_with_len(path: &Path, content: &str, len: usize) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(path.as_os_str().as_encoded_bytes());
    hasher.update(content.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(len);
    CacheKey(hex)
}

/// Whether an artifact was already present or had to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Written,
}

/// Flat directory of `<key>.<ext>` artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    /// The directory is not touched until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic artifact location for `key`, reusing the source's extension.
    pub fn artifact_path(&self, key: &CacheKey, source: &Path) -> PathBuf {
        match source.extension() {
            Some(ext) => {
                let mut name = std::ffi::OsString::from(key.as_str());
                name.push(".");
                name.push(ext);
                self.dir.join(name)
            }
            None => self.dir.join(key.as_str()),
        }
    }

    /// Make sure an artifact exists at `path`, producing its content with
    /// `render` only when it is absent. Existing artifacts are never rewritten.
    pub fn ensure(
        &self,
        path: &Path,
        render: impl FnOnce() -> String,
    ) -> Result<CacheStatus> {
        if path.exists() {
            return Ok(CacheStatus::Hit);
        }

        fs::create_dir_all(&self.dir).map_err(|e| LoaderError::io(&self.dir, e))?;
        self.write_atomic(path, render().as_bytes())?;
        Ok(CacheStatus::Written)
    }

    /// Write to a unique temp file in the cache dir, then rename into place so
    /// a concurrent reader never observes a partial artifact.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(LoaderError::io(&tmp, e));
        }

        // A racing writer may have renamed an identical payload already.
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            LoaderError::io(path, e)
        })
    }
}
