//! The load lifecycle.
//!
//! A [`BehaviorCatalog`] collects modules, builds them into a hook registry,
//! validates the result and freezes it into a [`BehaviorEngine`]:
//!
//! 1. **Collect** - `add_modules()` queues modules in load order
//! 2. **Build** - each module's `build()` declares hooks and bindings
//! 3. **Validate** - naming, dependency, conflict, placement and cycle checks
//! 4. **Freeze** - the registry and turn order become immutable
//! 5. **Ready** - each module's `ready()` sees the finished engine
//!
//! Any validation failure aborts loading; there is no partially loaded
//! engine.

use std::sync::Arc;

use hashbrown::HashSet;
use quill_hooks::error::ConflictError;
use quill_hooks::{BehaviorDispatcher, HookRegistry, LoadError, NamingConvention, Validator};
use tracing::{error, info, info_span};

use crate::engine::BehaviorEngine;
use crate::loader::ModuleLoader;
use crate::module::{BoxedModule, Modules};

/// Settings for a catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Prefix rules for hook ids.
    pub naming: NamingConvention,
    /// Turn handler panics into failed results instead of unwinding.
    pub catch_panics: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            naming: NamingConvention::default(),
            catch_panics: true,
        }
    }
}

impl CatalogConfig {
    /// Replaces the naming convention.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    /// Sets whether handler panics are caught.
    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }
}

/// Collects behavior modules and turns them into a [`BehaviorEngine`].
///
/// # Example
///
/// ```ignore
/// let mut catalog = BehaviorCatalog::new();
/// catalog
///     .add_modules(DefaultModules.build())
///     .add_modules(DoorsModule)
///     .add_modules(MyGameModule);
/// let engine = catalog.finalize_loading()?;
/// ```
#[derive(Default)]
pub struct BehaviorCatalog {
    config: CatalogConfig,
    modules: Vec<BoxedModule>,
    names: HashSet<String>,
    conflicts: Vec<ConflictError>,
}

impl BehaviorCatalog {
    /// Creates an empty catalog with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty catalog.
    #[must_use]
    pub fn with_config(config: CatalogConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The catalog's settings.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Adds a module or a module group.
    ///
    /// Two modules with the same name are a conflict, reported when loading
    /// is finalized.
    pub fn add_modules<M: Modules>(&mut self, modules: M) -> &mut Self {
        modules.add_to_catalog(self);
        self
    }

    pub(crate) fn add_module_boxed(&mut self, boxed: BoxedModule) {
        let name = boxed.name().to_owned();
        if !self.names.insert(name.clone()) {
            error!(target: "quill::catalog", module = %name, "module added twice");
            self.conflicts
                .push(ConflictError::DuplicateModule { module: name });
            return;
        }
        self.modules.push(boxed);
    }

    /// Returns true if a module with this name was added.
    #[must_use]
    pub fn has_module(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of modules queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if no module was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Builds, validates and freezes every module.
    ///
    /// On success each module's `ready()` has run, in load order, against
    /// the returned engine.
    pub fn finalize_loading(self) -> Result<BehaviorEngine, LoadError> {
        let _span = info_span!(target: "quill::catalog", "load", modules = self.modules.len()).entered();
        let Self {
            config,
            modules,
            names: _,
            mut conflicts,
        } = self;

        let mut registry = HookRegistry::new();
        for boxed in &modules {
            let module = &boxed.module;
            let mut loader =
                ModuleLoader::new(module.name(), module.tier(), &mut registry, &mut conflicts);
            module.build(&mut loader);
        }

        let scheduler = Validator::new(&registry, &config.naming)
            .with_conflicts(&conflicts)
            .run()?;

        let dispatcher =
            BehaviorDispatcher::new(Arc::new(registry)).with_catch_panics(config.catch_panics);
        let engine = BehaviorEngine::new(
            dispatcher,
            scheduler,
            modules
                .iter()
                .map(|m| (m.name().to_owned(), m.module.tier()))
                .collect(),
        );

        for boxed in &modules {
            boxed.module.ready(&engine);
        }

        info!(
            target: "quill::catalog",
            modules = modules.len(),
            hooks = engine.registry().len(),
            bindings = engine.registry().binding_count(),
            turn_phases = engine.turn_order().len(),
            "behavior catalog loaded"
        );
        Ok(engine)
    }
}
