//! The module-loading capability the boundary loader delegates to.

use std::path::Path;

/// Loads and evaluates a module from an absolute file path.
///
/// The boundary loader decides *which* path to hand over (the original
/// source or its stripped artifact); the host only executes it.
#[allow(async_fn_in_trait)]
pub trait ModuleHost {
    /// Handle to a loaded module.
    type Module;

    async fn load(&mut self, path: &Path) -> anyhow::Result<Self::Module>;
}
