//! Infrastructure modules for Quill.
//!
//! This crate provides the modules most games load before their own:
//!
//! - [`TracingModule`] - installs the `tracing` subscriber
//! - [`CoreTurnModule`] - declares the conventional core-tier turn phases
//! - [`DefaultModules`] - both of the above
//! - [`MinimalModules`] - turn phases only, for tests and headless tools
//!
//! # Example
//!
//! ```
//! use quill_core_modules::{DefaultModules, TURN_CLEANUP};
//! use quill_modules::{BehaviorCatalog, ModuleGroup};
//!
//! let mut catalog = BehaviorCatalog::new();
//! catalog.add_modules(DefaultModules.build());
//! let engine = catalog.finalize_loading().unwrap();
//! assert_eq!(engine.turn_order().last().map(|h| h.as_str()), Some(TURN_CLEANUP));
//! ```
//!
//! # Architecture
//!
//! - **Layer 0** (`quill_world`): entities, game state, core field guard
//! - **Layer 1** (`quill_hooks`): hooks, validation, scheduling, dispatch
//! - **Layer 2** (`quill_modules`): behavior modules and the load lifecycle
//! - **Layer 2** (`quill_core_modules`): infrastructure modules (this crate)

mod core_turn;
mod tracing_module;

// Re-export modules
pub use core_turn::CoreTurnModule;
pub use tracing_module::{TracingFormat, TracingModule};

// Re-export configuration and phase ids
pub use core_turn::{TURN_CLEANUP, TURN_ENVIRONMENT, TURN_NPC_ACTIONS, TURN_SCHEDULED_EVENTS};
pub use tracing_module::TracingConfig;

use quill_modules::{ModuleGroup, ModuleGroupBuilder};

/// Modules most games start from.
///
/// Includes:
/// - [`TracingModule`] - logging
/// - [`CoreTurnModule`] - core turn phases
///
/// Swap in a configured tracing module through the builder:
///
/// ```
/// use quill_core_modules::{DefaultModules, TracingModule};
/// use quill_modules::ModuleGroup;
/// use tracing::Level;
///
/// let modules = DefaultModules
///     .build()
///     .disable::<TracingModule>()
///     .add(TracingModule::default().with_level(Level::DEBUG));
/// assert_eq!(modules.names().collect::<Vec<_>>(), ["core_turn", "tracing"]);
/// ```
pub struct DefaultModules;

impl ModuleGroup for DefaultModules {
    fn build(self) -> ModuleGroupBuilder {
        ModuleGroupBuilder::new()
            .add(TracingModule::default())
            .add(CoreTurnModule)
    }
}

/// Core turn phases without logging setup.
///
/// Suitable for tests, which usually install their own subscriber or none.
pub struct MinimalModules;

impl ModuleGroup for MinimalModules {
    fn build(self) -> ModuleGroupBuilder {
        ModuleGroupBuilder::new().add(CoreTurnModule)
    }
}
