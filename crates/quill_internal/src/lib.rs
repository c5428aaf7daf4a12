//! # Quill Internal Library
//!
//! Re-exports the core Quill crates for convenience.

/// Layer 0: entities, game state and the core field guard.
pub use quill_world;

/// Layer 1: hooks, validation, turn-phase scheduling and dispatch.
pub use quill_hooks;

/// Layer 2: behavior modules and the load lifecycle.
pub use quill_modules;

/// Layer 2: infrastructure modules.
pub use quill_core_modules;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use quill_core_modules::{
        CoreTurnModule, DefaultModules, MinimalModules, TracingFormat, TracingModule,
    };
    pub use quill_hooks::prelude::*;
    pub use quill_modules::prelude::*;
    pub use quill_world::prelude::*;
}
