//! # Boundary Loader
//!
//! Decides whether a source module runs only on the server or may be shipped
//! to the client, rewrites client modules, and caches the rewritten artifact
//! content-addressably.
//!
//! - A module is **client-eligible** when one of its first five lines holds a
//!   `'use client'` / `"use client"` directive; everything else is
//!   **server-only**.
//! - Client modules are loaded from `<cache_dir>/<key>.<ext>`, where `key` is
//!   a truncated SHA-256 of the module's path and content and the artifact is
//!   the source with the directive removed. Artifacts are written once and
//!   never rewritten.
//! - Server modules are loaded from their own path and never touch the cache.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boundary_loader::{BoundaryLoader, JsHost, LoaderConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig::for_project("./app");
//!     let loader = BoundaryLoader::new(config.clone());
//!     let mut host = JsHost::new(&config)?;
//!
//!     let module = loader.resolve_and_load(&mut host, "./app/components/counter.js").await?;
//!     println!("loaded {}", module.specifier);
//!     Ok(())
//! }
//! ```

mod boundary;
mod cache;
mod config;
mod directive;
mod error;
mod exports;
mod host;
mod loader;
mod runtime;

pub use boundary::{BoundaryLoader, CachedArtifact, ResolvedModule};
pub use cache::{cache_key, cache_key_with_len, ArtifactCache, CacheKey, CacheStatus};
pub use config::{LoaderConfig, DEFAULT_CACHE_DIR, DEFAULT_KEY_LENGTH};
pub use directive::{classify, strip_directive, Boundary, DIRECTIVE_SCAN_LINES};
pub use error::{LoaderError, Result};
pub use exports::{extract_component_names, scan_directory, ComponentMap};
pub use host::ModuleHost;
pub use loader::SandboxedLoader;
pub use runtime::{create_runtime, JsHost, JsModule};
