//! The module registry: load, reload, and enumerate modules.
//!
//! [`ModuleRegistry`] owns two maps: registered [`ModuleSource`]s (the
//! declarations) and loaded [`Module`]s (the compiled values). Loading is
//! transactional *per module*: a module either installs completely or not
//! at all, and a failed reload leaves the previously loaded version
//! running. Hot-reload must never leave the system with zero handlers for
//! a module that previously worked.
//!
//! Installed modules are `Arc`s swapped atomically under a short-lived
//! lock; dispatch takes a snapshot of the map and is unaffected by a
//! concurrent reload.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::module::{Module, ModuleSource};

/// The central owner of all loaded modules.
#[derive(Default)]
pub struct ModuleRegistry {
    sources: RwLock<HashMap<String, Arc<dyn ModuleSource>>>,
    modules: RwLock<HashMap<String, Arc<Module>>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module source without loading it.
    ///
    /// Registering a second source under the same name replaces the first;
    /// an already-loaded module keeps running until the next load or
    /// reload picks up the new source.
    pub fn register_source(&self, source: Arc<dyn ModuleSource>) {
        let name = source.name().to_string();
        if self.sources.write().insert(name.clone(), source).is_some() {
            warn!(module = %name, "Replaced an existing module source");
        }
    }

    /// Loads (or reloads) one module from its registered source.
    ///
    /// All handler declarations are compiled before anything is installed.
    /// On any failure the previously loaded version, if one exists,
    /// remains active and the error is returned.
    pub fn load_module(&self, name: &str) -> Result<Arc<Module>, LoadError> {
        let source = self
            .sources
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownModule(name.to_string()))?;

        let decls = source.handlers()?;
        let module = Module::build(name, decls)?;

        self.modules
            .write()
            .insert(name.to_string(), Arc::clone(&module));
        info!(
            module = %name,
            handlers = module.handler_count(),
            "Module loaded"
        );
        Ok(module)
    }

    /// Loads every registered source.
    ///
    /// Failures are isolated per module; the returned list holds each
    /// failing module's name and error for caller reporting.
    pub fn load_all(&self) -> Vec<(String, LoadError)> {
        let names: Vec<String> = self.sources.read().keys().cloned().collect();
        self.load_named(names)
    }

    /// Reloads every currently *loaded* module.
    ///
    /// This is the hot-reload entry point: modules that fail to reload
    /// keep their previous in-memory version running, and the failure
    /// list is returned for reporting. Reload is transactional per
    /// module, never process-wide.
    pub fn reload_modules(&self) -> Vec<(String, LoadError)> {
        let names: Vec<String> = self.modules.read().keys().cloned().collect();
        debug!(count = names.len(), "Reloading modules");
        self.load_named(names)
    }

    fn load_named(&self, names: Vec<String>) -> Vec<(String, LoadError)> {
        let mut failures = Vec::new();
        for name in names {
            if let Err(e) = self.load_module(&name) {
                warn!(module = %name, error = %e, "Module failed to load, keeping prior version");
                failures.push((name, e));
            }
        }
        failures
    }

    /// Removes a loaded module and its source.
    pub fn unload(&self, name: &str) -> bool {
        self.sources.write().remove(name);
        let removed = self.modules.write().remove(name).is_some();
        if removed {
            info!(module = %name, "Module unloaded");
        }
        removed
    }

    /// Returns the loaded module under `name`, if any.
    pub fn module(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.read().get(name).cloned()
    }

    /// Whether a fully-loaded module exists under `name`.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    /// A consistent snapshot of all loaded modules, sorted by name.
    ///
    /// Dispatch iterates this snapshot; a reload that lands mid-iteration
    /// swaps the map entries but never the `Arc`s already in the snapshot.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        let mut modules: Vec<Arc<Module>> = self.modules.read().values().cloned().collect();
        modules.sort_by(|a, b| a.name().cmp(b.name()));
        modules
    }

    /// The number of loaded modules.
    pub fn module_count(&self) -> usize {
        self.modules.read().len()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("sources", &self.sources.read().len())
            .field("modules", &self.modules.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerDecl;
    use crate::module::StaticModule;

    fn ping_module(name: &str) -> Arc<dyn ModuleSource> {
        Arc::new(
            StaticModule::new(name)
                .handler(HandlerDecl::new("ping", "^ping$", |_inv| async { Ok(()) })),
        )
    }

    /// A source whose declarations can be made invalid between loads.
    struct SwitchableSource {
        name: String,
        broken: std::sync::atomic::AtomicBool,
    }

    impl SwitchableSource {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                broken: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    impl ModuleSource for SwitchableSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn handlers(&self) -> Result<Vec<HandlerDecl>, LoadError> {
            let pattern = if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
                "(unclosed"
            } else {
                "^ok$"
            };
            Ok(vec![HandlerDecl::new("ok", pattern, |_inv| async {
                Ok(())
            })])
        }
    }

    #[test]
    fn load_unknown_module_fails() {
        let registry = ModuleRegistry::new();
        assert!(matches!(
            registry.load_module("nope"),
            Err(LoadError::UnknownModule(_))
        ));
    }

    #[test]
    fn load_installs_exactly_one_module_per_name() {
        let registry = ModuleRegistry::new();
        registry.register_source(ping_module("chat"));

        assert!(!registry.is_loaded("chat"));
        registry.load_module("chat").unwrap();
        assert!(registry.is_loaded("chat"));

        registry.load_module("chat").unwrap();
        assert_eq!(registry.module_count(), 1);
    }

    #[test]
    fn failed_reload_keeps_the_previous_version() {
        let registry = ModuleRegistry::new();
        let source = Arc::new(SwitchableSource::new("flaky"));
        registry.register_source(Arc::clone(&source) as Arc<dyn ModuleSource>);

        let before = registry.load_module("flaky").unwrap();

        source
            .broken
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let failures = registry.reload_modules();

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "flaky");
        // The installed module is the exact same value as before the
        // failed reload.
        assert!(Arc::ptr_eq(&before, &registry.module("flaky").unwrap()));
    }

    #[test]
    fn reload_failure_is_isolated_per_module() {
        let registry = ModuleRegistry::new();
        let flaky = Arc::new(SwitchableSource::new("flaky"));
        registry.register_source(Arc::clone(&flaky) as Arc<dyn ModuleSource>);
        registry.register_source(ping_module("solid"));

        assert!(registry.load_all().is_empty());
        let solid_before = registry.module("solid").unwrap();

        flaky
            .broken
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let failures = registry.reload_modules();

        let failed: Vec<&str> = failures.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(failed, ["flaky"]);
        // The healthy module was replaced by a fresh, fully-loaded value.
        let solid_after = registry.module("solid").unwrap();
        assert!(!Arc::ptr_eq(&solid_before, &solid_after));
        assert_eq!(solid_after.handler_count(), 1);
    }

    #[test]
    fn unload_removes_module_and_source() {
        let registry = ModuleRegistry::new();
        registry.register_source(ping_module("chat"));
        registry.load_module("chat").unwrap();

        assert!(registry.unload("chat"));
        assert!(!registry.is_loaded("chat"));
        assert!(matches!(
            registry.load_module("chat"),
            Err(LoadError::UnknownModule(_))
        ));
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let registry = ModuleRegistry::new();
        registry.register_source(ping_module("zeta"));
        registry.register_source(ping_module("alpha"));
        registry.load_all();

        let modules = registry.modules();
        let names: Vec<&str> = modules.iter().map(|m| m.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
