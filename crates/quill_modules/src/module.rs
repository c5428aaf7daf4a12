//! Behavior modules and module groups.
//!
//! A behavior module is the unit of authoring. It declares hooks, binds
//! handlers to them, and is attached to entities by name through their
//! `behaviors` list.
//!
//! # Example
//!
//! ```
//! use quill_hooks::{HookDefinition, HookResult, Tier};
//! use quill_modules::{BehaviorCatalog, BehaviorModule, ModuleLoader};
//!
//! struct Lockable;
//!
//! impl BehaviorModule for Lockable {
//!     fn name(&self) -> &str {
//!         "lockable"
//!     }
//!
//!     fn build(&self, loader: &mut ModuleLoader<'_>) {
//!         loader
//!             .define_hook(HookDefinition::entity("entity_open"))
//!             .bind("entity_open", |inv| {
//!                 let locked = inv
//!                     .entity()
//!                     .and_then(|e| e.property("locked"))
//!                     .and_then(|v| v.as_bool())
//!                     .unwrap_or(false);
//!                 Ok(if locked {
//!                     HookResult::denied("It's locked.")
//!                 } else {
//!                     HookResult::allowed()
//!                 })
//!             });
//!     }
//! }
//!
//! let mut catalog = BehaviorCatalog::new();
//! catalog.add_modules(Lockable);
//! let engine = catalog.finalize_loading().unwrap();
//! assert!(engine.registry().contains("entity_open"));
//! ```

use core::any::TypeId;

use quill_hooks::Tier;

use crate::catalog::BehaviorCatalog;
use crate::engine::BehaviorEngine;
use crate::loader::ModuleLoader;

// ─────────────────────────────────────────────────────────────────────────────
// BehaviorModule Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A bundle of hook definitions and handlers.
///
/// Modules follow the catalog lifecycle:
///
/// 1. **Build** - `build()` is called once per module, in load order, and
///    declares hooks and bindings through the [`ModuleLoader`]
/// 2. **Validate** - the catalog checks everything that was declared
/// 3. **Ready** - `ready()` is called in load order on the frozen engine
pub trait BehaviorModule: Send + Sync + 'static {
    /// The name entities use to attach this module. Must be unique within a
    /// catalog.
    fn name(&self) -> &str;

    /// Rank of this module's handlers. Higher tiers run first and may
    /// delegate to lower ones.
    fn tier(&self) -> Tier {
        Tier::LIBRARY
    }

    /// Declares hooks and bindings.
    fn build(&self, loader: &mut ModuleLoader<'_>);

    /// Called after validation succeeded and the engine is frozen.
    fn ready(&self, _engine: &BehaviorEngine) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Modules Trait (for add_modules polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be added to a catalog: a single [`BehaviorModule`] or a
/// [`ModuleGroupBuilder`].
pub trait Modules {
    /// Adds these modules to the catalog.
    fn add_to_catalog(self, catalog: &mut BehaviorCatalog);
}

impl<M: BehaviorModule> Modules for M {
    fn add_to_catalog(self, catalog: &mut BehaviorCatalog) {
        catalog.add_module_boxed(BoxedModule::new(self));
    }
}

impl Modules for ModuleGroupBuilder {
    fn add_to_catalog(self, catalog: &mut BehaviorCatalog) {
        for boxed in self.modules {
            catalog.add_module_boxed(boxed);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ModuleGroup Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A collection of modules that are usually loaded together.
///
/// ```ignore
/// catalog.add_modules(
///     DefaultModules
///         .build()
///         .disable::<TracingModule>()
///         .add(DoorsModule),
/// );
/// ```
pub trait ModuleGroup {
    /// Returns the modules in this group.
    fn build(self) -> ModuleGroupBuilder;
}

// ─────────────────────────────────────────────────────────────────────────────
// BoxedModule
// ─────────────────────────────────────────────────────────────────────────────

/// A boxed module with its concrete type captured for group editing.
pub(crate) struct BoxedModule {
    pub(crate) type_id: TypeId,
    pub(crate) module: Box<dyn BehaviorModule>,
}

impl BoxedModule {
    fn new<M: BehaviorModule>(module: M) -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            module: Box::new(module),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.module.name()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ModuleGroupBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for customizing module groups. Order in the group is load order.
#[derive(Default)]
pub struct ModuleGroupBuilder {
    modules: Vec<BoxedModule>,
}

impl ModuleGroupBuilder {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module to the end of the group.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add<M: BehaviorModule>(mut self, module: M) -> Self {
        self.modules.push(BoxedModule::new(module));
        self
    }

    /// Adds a module before the first module of type `Target`, or at the
    /// front if there is none.
    #[must_use]
    pub fn add_before<M: BehaviorModule, Target: BehaviorModule>(mut self, module: M) -> Self {
        let position = self.position_of::<Target>().unwrap_or(0);
        self.modules.insert(position, BoxedModule::new(module));
        self
    }

    /// Adds a module after the first module of type `Target`, or at the end
    /// if there is none.
    #[must_use]
    pub fn add_after<M: BehaviorModule, Target: BehaviorModule>(mut self, module: M) -> Self {
        let position = self
            .position_of::<Target>()
            .map_or(self.modules.len(), |i| i + 1);
        self.modules.insert(position, BoxedModule::new(module));
        self
    }

    /// Removes every module of type `M`. No-op if there is none.
    #[must_use]
    pub fn disable<M: BehaviorModule>(mut self) -> Self {
        let target = TypeId::of::<M>();
        self.modules.retain(|m| m.type_id != target);
        self
    }

    /// Module names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(BoxedModule::name)
    }

    /// Number of modules in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn position_of<Target: BehaviorModule>(&self) -> Option<usize> {
        let target = TypeId::of::<Target>();
        self.modules.iter().position(|m| m.type_id == target)
    }
}
