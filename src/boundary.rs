//! Resolve a module across the server/client boundary and load it.
//!
//! Server-only modules are loaded from their own path. Client-eligible
//! modules are loaded from a stripped artifact in the content-addressed
//! cache, written on first sight of each (path, content) pair.

use crate::cache::{cache_key_with_len, ArtifactCache, CacheKey, CacheStatus};
use crate::config::LoaderConfig;
use crate::directive::{classify, strip_directive, Boundary};
use crate::error::{LoaderError, Result};
use crate::exports::{scan_directory, ComponentMap};
use crate::host::ModuleHost;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Cache details for a client-eligible module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedArtifact {
    pub key: CacheKey,
    pub status: CacheStatus,
}

/// Outcome of resolution: what the host should load, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModule {
    /// Absolute path of the requested source
    pub source: PathBuf,
    pub boundary: Boundary,
    /// Path handed to the module host
    pub load_path: PathBuf,
    /// Present only for client-eligible modules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<CachedArtifact>,
}

/// Stateless apart from its configuration; safe to share across threads.
#[derive(Debug, Clone)]
pub struct BoundaryLoader {
    config: LoaderConfig,
    cache: ArtifactCache,
}

impl BoundaryLoader {
    pub fn new(config: LoaderConfig) -> Self {
        let cache = ArtifactCache::new(config.resolved_cache_dir());
        Self { config, cache }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Classify `path` and, for client modules, make sure its stripped
    /// artifact exists. Does not load anything.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<ResolvedModule> {
        let path = path.as_ref();
        let source = std::path::absolute(path).map_err(|e| LoaderError::io(path, e))?;

        if !source.exists() {
            return Err(LoaderError::NotFound { path: source });
        }

        let content = fs::read_to_string(&source).map_err(|e| LoaderError::io(&source, e))?;
        let boundary = classify(&content);
        tracing::debug!(path = %source.display(), %boundary, "classified module");

        if !boundary.is_client() {
            return Ok(ResolvedModule {
                load_path: source.clone(),
                source,
                boundary,
                artifact: None,
            });
        }

        let key = cache_key_with_len(&source, &content, self.config.key_length);
        let load_path = self.cache.artifact_path(&key, &source);
        let status = self.cache.ensure(&load_path, || strip_directive(&content))?;
        tracing::debug!(
            path = %source.display(),
            %key,
            ?status,
            artifact = %load_path.display(),
            "client artifact ready"
        );

        Ok(ResolvedModule {
            source,
            boundary,
            load_path,
            artifact: Some(CachedArtifact { key, status }),
        })
    }

    /// Resolve `path` and load the resulting module through `host`.
    pub async fn resolve_and_load<H: ModuleHost>(
        &self,
        host: &mut H,
        path: impl AsRef<Path>,
    ) -> Result<H::Module> {
        let resolved = self.resolve(path)?;
        self.load_resolved(host, &resolved).await
    }

    /// Load an already resolved module from its load path.
    pub async fn load_resolved<H: ModuleHost>(
        &self,
        host: &mut H,
        resolved: &ResolvedModule,
    ) -> Result<H::Module> {
        tracing::trace!(path = %resolved.load_path.display(), "loading module");
        host.load(&resolved.load_path)
            .await
            .map_err(|source| LoaderError::Host {
                path: resolved.load_path.clone(),
                source,
            })
    }

    /// Scan `dir` for component exports using the configured extensions.
    pub fn scan_components(&self, dir: impl AsRef<Path>) -> Result<ComponentMap> {
        scan_directory(dir, &self.config.component_extensions)
    }
}
