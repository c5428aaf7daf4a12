//! Hook registry, validation, scheduling and dispatch for Quill (Layer 1).
//!
//! Behavior modules extend a game through named hooks. This crate owns the
//! machinery that makes independently authored modules safe to combine:
//!
//! - [`HookRegistry`] - hook definitions and the handlers bound to them
//! - [`Validator`] - load-time checks that abort at the first failing category
//! - [`TurnPhaseScheduler`] - the dependency-ordered list of turn phases
//! - [`BehaviorDispatcher`] - tiered, composing handler invocation
//!
//! # Hook kinds
//!
//! A [`HookKind::TurnPhase`] hook fires once per turn, globally, in the order
//! computed from its `after`/`before` constraints. A [`HookKind::Entity`]
//! hook fires when a command targets an entity, for example `entity_take`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use quill_hooks::prelude::*;
//! use quill_world::{Entity, GameState};
//!
//! let mut registry = HookRegistry::new();
//! registry
//!     .register(HookDefinition::entity("entity_take").owned_by("cursed"))
//!     .unwrap();
//! registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |_| {
//!     Ok(HookResult::denied("The idol will not budge."))
//! }));
//!
//! let mut state = GameState::new();
//! state
//!     .spawn(Entity::item("idol", "golden idol").with_behavior("cursed"))
//!     .unwrap();
//!
//! let dispatcher = BehaviorDispatcher::new(Arc::new(registry));
//! let result = dispatcher.dispatch(
//!     Some(&"idol".into()),
//!     "entity_take",
//!     &mut state,
//!     &HookContext::new(),
//! );
//! assert!(!result.allow);
//! assert_eq!(result.message.as_deref(), Some("The idol will not budge."));
//! ```
//!
//! # Architecture
//!
//! - **Layer 0** (`quill_world`): entities, game state, core field guard
//! - **Layer 1** (`quill_hooks`): hooks, validation, scheduling, dispatch (this crate)
//! - **Layer 2** (`quill_modules`): behavior modules and the load lifecycle

/// Handler bindings and handler errors.
pub mod binding;

/// Tiered dispatch and delegation.
pub mod dispatch;

/// Load-time error types.
pub mod error;

/// Hook ids, kinds, tiers and definitions.
pub mod hook;

/// Hook definition and binding storage.
pub mod registry;

/// Handler and phase results.
pub mod result;

/// Turn-phase ordering.
pub mod schedule;

/// Load-time validation.
pub mod validate;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::binding::{BindingScope, EventBinding, HandlerError};
    pub use crate::dispatch::{BehaviorDispatcher, HookContext, Invocation};
    pub use crate::error::{
        ConflictError, CycleError, DependencyError, LoadError, NamingError, PlacementError,
    };
    pub use crate::hook::{HookDefinition, HookId, HookKind, NamingConvention, Tier};
    pub use crate::registry::{HookRegistry, Registration};
    pub use crate::result::{DeferredEffect, HookResult, PhaseRecord};
    pub use crate::schedule::TurnPhaseScheduler;
    pub use crate::validate::Validator;
}

// Re-export key types at crate root for convenience
pub use binding::{EventBinding, HandlerError};
pub use dispatch::{BehaviorDispatcher, DelegationStack, HookContext, Invocation};
pub use error::LoadError;
pub use hook::{HookDefinition, HookId, HookKind, NamingConvention, Tier};
pub use registry::HookRegistry;
pub use result::{HookResult, PhaseRecord};
pub use schedule::TurnPhaseScheduler;
pub use validate::Validator;
