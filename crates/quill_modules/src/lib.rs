//! Behavior modules and the load lifecycle for Quill (Layer 2).
//!
//! Everything a game does beyond moving entities around is delivered by
//! behavior modules. This crate defines how modules are written, grouped and
//! loaded:
//!
//! - [`BehaviorModule`] - the unit of authoring
//! - [`ModuleGroup`] / [`ModuleGroupBuilder`] - bundles of modules
//! - [`ModuleLoader`] - what a module declares hooks and bindings through
//! - [`BehaviorCatalog`] - collects modules and validates them
//! - [`BehaviorEngine`] - the frozen result used during play
//!
//! # Architecture
//!
//! - **Layer 0** (`quill_world`): entities, game state, core field guard
//! - **Layer 1** (`quill_hooks`): hooks, validation, scheduling, dispatch
//! - **Layer 2** (`quill_modules`): behavior modules and the load lifecycle (this crate)
//! - **Layer 2** (`quill_core_modules`): infrastructure modules

/// Load lifecycle and catalog settings.
pub mod catalog;

/// The frozen engine.
pub mod engine;

/// Build-time declaration handle.
pub mod loader;

/// Module trait and module groups.
pub mod module;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::catalog::{BehaviorCatalog, CatalogConfig};
    pub use crate::engine::BehaviorEngine;
    pub use crate::loader::ModuleLoader;
    pub use crate::module::{BehaviorModule, ModuleGroup, ModuleGroupBuilder, Modules};
}

// Re-export key types at crate root for convenience
pub use catalog::{BehaviorCatalog, CatalogConfig};
pub use engine::BehaviorEngine;
pub use loader::ModuleLoader;
pub use module::{BehaviorModule, ModuleGroup, ModuleGroupBuilder, Modules};
