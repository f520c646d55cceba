//! JS host - evaluates resolved modules in a sandboxed V8 isolate.
//!
//! Module loading is restricted to the project root and the artifact cache;
//! there is no fs, net or env access from inside the isolate.

use crate::config::LoaderConfig;
use crate::host::ModuleHost;
use crate::loader::SandboxedLoader;
use anyhow::{anyhow, Error};
use deno_core::{
    v8, JsRuntime, ModuleId, ModuleLoader, ModuleSpecifier, PollEventLoopOptions, RuntimeOptions,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

/// A module evaluated by [`JsHost`]
#[derive(Clone)]
pub struct JsModule {
    pub id: ModuleId,
    pub specifier: ModuleSpecifier,
    pub namespace: v8::Global<v8::Object>,
}

fn build_runtime(config: &LoaderConfig) -> Result<(JsRuntime, Rc<SandboxedLoader>), Error> {
    let roots = [config.project_root.clone(), config.resolved_cache_dir()];
    let loader = Rc::new(SandboxedLoader::new(&roots, &config.module_extensions)?);
    let module_loader: Rc<dyn ModuleLoader> = loader.clone();

    // Configure V8 heap limits if specified
    let create_params = config
        .max_heap_size
        .map(|max_bytes| v8::Isolate::create_params().heap_limits(0, max_bytes));

    let mut runtime = JsRuntime::new(RuntimeOptions {
        module_loader: Some(module_loader),
        create_params,
        ..Default::default()
    });

    // Add near-heap-limit callback to gracefully handle OOM
    if config.max_heap_size.is_some() {
        runtime.add_near_heap_limit_callback(|current, initial| {
            // Keep the limit so V8 raises OOM instead of growing the heap
            tracing::warn!(
                current_mb = current / (1024 * 1024),
                initial_mb = initial / (1024 * 1024),
                "near heap limit"
            );
            current
        });
    }

    Ok((runtime, loader))
}

/// Create a sandboxed JS runtime that can import from the project and cache
pub fn create_runtime(config: &LoaderConfig) -> Result<JsRuntime, Error> {
    build_runtime(config).map(|(runtime, _)| runtime)
}

/// [`ModuleHost`] backed by a deno_core runtime.
///
/// V8 isolates are single-threaded; create one host per thread or task.
/// The timeout watchdog runs as a tokio task, so it only fires on a
/// multi-threaded runtime.
///
/// An isolate evaluates each module once. Loading a path again returns the
/// module recorded the first time, so a server-only source edited after
/// its first load keeps being served in its old version until a fresh host
/// is created. Client artifacts are unaffected: an edit changes their key
/// and therefore their path. A module whose evaluation failed (or timed
/// out) stays failed for the lifetime of the host.
pub struct JsHost {
    runtime: JsRuntime,
    loader: Rc<SandboxedLoader>,
    timeout_ms: Option<u64>,
    /// Roots evaluated through this host
    modules: HashMap<ModuleSpecifier, JsModule>,
    /// Modules evaluated as dependencies of a successful root
    dependencies: HashSet<ModuleSpecifier>,
    /// Modules whose graph failed, with the original error message
    failed: HashMap<ModuleSpecifier, String>,
}

impl JsHost {
    pub fn new(config: &LoaderConfig) -> Result<Self, Error> {
        let (runtime, loader) = build_runtime(config)?;
        Ok(Self {
            runtime,
            loader,
            timeout_ms: config.timeout_ms,
            modules: HashMap::new(),
            dependencies: HashSet::new(),
            failed: HashMap::new(),
        })
    }

    pub fn runtime(&mut self) -> &mut JsRuntime {
        &mut self.runtime
    }

    fn specifier_for(path: &Path) -> Result<ModuleSpecifier, Error> {
        ModuleSpecifier::from_file_path(path)
            .map_err(|_| anyhow!("Failed to create module specifier for '{}'", path.display()))
    }

    /// Module already settled in this isolate, if any.
    async fn lookup(&mut self, specifier: &ModuleSpecifier) -> Option<Result<JsModule, Error>> {
        if let Some(module) = self.modules.get(specifier) {
            return Some(Ok(module.clone()));
        }
        if let Some(message) = self.failed.get(specifier) {
            return Some(Err(anyhow!(
                "'{}' failed earlier in this isolate: {}",
                specifier,
                message
            )));
        }
        if !self.dependencies.contains(specifier) {
            return None;
        }

        // Already evaluated as an import; the module map hands back its id
        let module: Result<JsModule, Error> = async {
            let id = self.runtime.load_side_es_module(specifier).await?;
            let namespace = self.runtime.get_module_namespace(id)?;
            Ok(JsModule {
                id,
                specifier: specifier.clone(),
                namespace,
            })
        }
        .await;
        if let Ok(module) = &module {
            self.modules.insert(specifier.clone(), module.clone());
        }
        Some(module)
    }

    async fn evaluate(&mut self, specifier: &ModuleSpecifier) -> Result<JsModule, Error> {
        let id = self.runtime.load_side_es_module(specifier).await?;
        let evaluation = self.runtime.mod_evaluate(id);
        self.runtime
            .run_event_loop(PollEventLoopOptions::default())
            .await?;
        evaluation.await?;

        let namespace = self.runtime.get_module_namespace(id)?;
        Ok(JsModule {
            id,
            specifier: specifier.clone(),
            namespace,
        })
    }

    async fn evaluate_with_timeout(&mut self, specifier: &ModuleSpecifier) -> Result<JsModule, Error> {
        let Some(ms) = self.timeout_ms else {
            return self.evaluate(specifier).await;
        };

        // Get a handle to terminate execution if needed
        let isolate_handle = self.runtime.v8_isolate().thread_safe_handle();

        // Spawn a task that will terminate execution after timeout
        let timeout_handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            isolate_handle.terminate_execution();
        });

        let result = self.evaluate(specifier).await;

        // Cancel the timeout task if we finished in time
        timeout_handle.abort();
        let _ = timeout_handle.await;

        // Clear a termination that fired late so the next load can run
        let _ = self.runtime.v8_isolate().cancel_terminate_execution();

        // Check if we were terminated due to timeout
        // V8 termination can manifest as various errors
        match result {
            Err(e) => {
                let err_str = e.to_string();
                if err_str.contains("terminated") || err_str.contains("unresolved promise") {
                    Err(anyhow!("Module evaluation timed out after {}ms", ms))
                } else {
                    Err(e)
                }
            }
            ok => ok,
        }
    }
}

impl ModuleHost for JsHost {
    type Module = JsModule;

    async fn load(&mut self, path: &Path) -> Result<JsModule, Error> {
        let specifier = Self::specifier_for(path)?;

        if let Some(settled) = self.lookup(&specifier).await {
            return settled;
        }

        // Discard anything logged by earlier lookups
        self.loader.take_loaded();
        let result = self.evaluate_with_timeout(&specifier).await;
        let graph = self.loader.take_loaded();

        match &result {
            Ok(module) => {
                self.dependencies
                    .extend(graph.into_iter().filter(|s| *s != specifier));
                self.modules.insert(specifier, module.clone());
            }
            Err(e) => {
                let message = e.to_string();
                tracing::debug!(%specifier, error = %message, "module graph failed");
                for failed in graph {
                    self.failed.entry(failed).or_insert_with(|| message.clone());
                }
                self.failed.insert(specifier, message);
            }
        }

        result
    }
}
