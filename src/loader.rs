//! Sandboxed deno_core module loader for the JS host.
//!
//! Imports are confined to a set of allowed roots (the project and the
//! artifact cache). Network specifiers, filesystem escape and unexpected
//! file types are rejected.

use deno_core::{
    anyhow::{anyhow, Error},
    ModuleLoadResponse, ModuleLoader, ModuleSource, ModuleSourceCode, ModuleSpecifier,
    ModuleType, RequestedModuleType, ResolutionKind,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// A module loader that restricts all imports to a fixed set of directories.
///
/// Every specifier it serves is logged until drained with
/// [`SandboxedLoader::take_loaded`], so the host can tell which modules a
/// graph pulled into the isolate.
pub struct SandboxedLoader {
    allowed_roots: Vec<PathBuf>,
    extensions: Vec<String>,
    loaded: RefCell<Vec<ModuleSpecifier>>,
}

impl SandboxedLoader {
    /// Create a loader allowing imports from `roots` with one of `extensions`.
    ///
    /// The first root is where bare specifiers resolve. Roots that do not
    /// exist yet (an artifact cache before its first write) are created so
    /// they can be canonicalized.
    pub fn new<P: AsRef<Path>>(roots: &[P], extensions: &[String]) -> Result<Self, Error> {
        if roots.is_empty() {
            return Err(anyhow!("SandboxedLoader needs at least one allowed root"));
        }

        let mut allowed_roots = Vec::with_capacity(roots.len());
        for root in roots {
            let root = root.as_ref();
            std::fs::create_dir_all(root)
                .map_err(|e| anyhow!("Failed to create '{}': {}", root.display(), e))?;
            let canonical = root
                .canonicalize()
                .map_err(|e| anyhow!("Failed to canonicalize '{}': {}", root.display(), e))?;
            if !canonical.is_dir() {
                return Err(anyhow!("'{}' must be a directory", root.display()));
            }
            allowed_roots.push(canonical);
        }

        Ok(Self {
            allowed_roots,
            extensions: extensions.to_vec(),
            loaded: RefCell::new(Vec::new()),
        })
    }

    /// Drain the specifiers served since the last call.
    pub fn take_loaded(&self) -> Vec<ModuleSpecifier> {
        std::mem::take(&mut *self.loaded.borrow_mut())
    }

    /// Check if a path is within one of the allowed roots.
    /// Uses canonicalization to resolve symlinks and prevent traversal.
    fn is_path_allowed(&self, path: &Path) -> bool {
        match path.canonicalize() {
            Ok(canonical) => self.allowed_roots.iter().any(|root| canonical.starts_with(root)),
            Err(_) => false,
        }
    }

    fn is_extension_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    fn check(&self, path: &Path) -> Result<(), Error> {
        // Security check: path must be within an allowed root
        if !self.is_path_allowed(path) {
            return Err(anyhow!(
                "Access denied: '{}' is outside the allowed directories",
                path.display()
            ));
        }

        // Extension check
        if !self.is_extension_allowed(path) {
            return Err(anyhow!(
                "Only {} files allowed, got: {}",
                self.extensions.join("/"),
                path.display()
            ));
        }
        Ok(())
    }
}

impl ModuleLoader for SandboxedLoader {
    fn resolve(
        &self,
        specifier: &str,
        referrer: &str,
        _kind: ResolutionKind,
    ) -> Result<ModuleSpecifier, Error> {
        // Block all remote URLs
        if specifier.starts_with("http://")
            || specifier.starts_with("https://")
            || specifier.starts_with("data:")
            || specifier.starts_with("blob:")
        {
            return Err(anyhow!("Remote imports are forbidden: {}", specifier));
        }

        // Resolve the specifier
        let resolved = if specifier.starts_with("./") || specifier.starts_with("../") {
            // Relative import - resolve against referrer
            let referrer_url = ModuleSpecifier::parse(referrer)
                .map_err(|e| anyhow!("Invalid referrer '{}': {}", referrer, e))?;
            referrer_url
                .join(specifier)
                .map_err(|e| anyhow!("Failed to resolve '{}': {}", specifier, e))?
        } else if specifier.starts_with("file://") {
            // Absolute file URL
            ModuleSpecifier::parse(specifier)
                .map_err(|e| anyhow!("Invalid file URL '{}': {}", specifier, e))?
        } else if specifier.starts_with('/') {
            // Absolute path - convert to file URL
            ModuleSpecifier::from_file_path(specifier)
                .map_err(|_| anyhow!("Invalid absolute path: {}", specifier))?
        } else {
            // Bare specifier - resolve from the project root
            ModuleSpecifier::from_file_path(self.allowed_roots[0].join(specifier))
                .map_err(|_| anyhow!("Invalid bare specifier: {}", specifier))?
        };

        // Ensure it's a file:// URL
        if resolved.scheme() != "file" {
            return Err(anyhow!(
                "Only file:// URLs allowed, got: {}",
                resolved.scheme()
            ));
        }

        // Get the filesystem path
        let path = resolved
            .to_file_path()
            .map_err(|_| anyhow!("Failed to convert URL to path: {}", resolved))?;
        self.check(&path)?;

        Ok(resolved)
    }

    fn load(
        &self,
        module_specifier: &ModuleSpecifier,
        _maybe_referrer: Option<&ModuleSpecifier>,
        _is_dyn_import: bool,
        _requested_module_type: RequestedModuleType,
    ) -> ModuleLoadResponse {
        // Convert to path
        let path = match module_specifier.to_file_path() {
            Ok(p) => p,
            Err(_) => {
                return ModuleLoadResponse::Sync(Err(anyhow!(
                    "Invalid file path: {}",
                    module_specifier
                )));
            }
        };

        // Entry modules arrive here without going through resolve()
        if let Err(e) = self.check(&path) {
            return ModuleLoadResponse::Sync(Err(e));
        }

        // Load the file content
        let code = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                return ModuleLoadResponse::Sync(Err(anyhow!(
                    "Failed to read '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        self.loaded.borrow_mut().push(module_specifier.clone());
        ModuleLoadResponse::Sync(Ok(ModuleSource::new(
            ModuleType::JavaScript,
            ModuleSourceCode::String(code.into()),
            module_specifier,
            None,
        )))
    }
}
