//! Load-time authoring errors.
//!
//! These are never recoverable at runtime: any of them aborts loading, and
//! every variant names the offending hook id(s) and owning module(s).

use core::fmt;

use quill_world::EntityId;

use crate::hook::{HookId, HookKind, NamingRule};

fn bullets<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A failed load, grouped by the first validation category that failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// Hook ids that do not follow the naming convention for their kind.
    #[error("hook naming errors:\n{}", bullets(.0))]
    Naming(Vec<NamingError>),

    /// Ordering constraints or bindings that reference unusable hooks.
    #[error("hook dependency errors:\n{}", bullets(.0))]
    Dependency(Vec<DependencyError>),

    /// Incompatible declarations of the same hook or module.
    #[error("hook conflicts:\n{}", bullets(.0))]
    Conflict(Vec<ConflictError>),

    /// Turn-phase hooks bound to individual entities.
    #[error("hook placement errors:\n{}", bullets(.0))]
    Placement(Vec<PlacementError>),

    /// The turn phases cannot be ordered.
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

impl LoadError {
    /// Short category name.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            LoadError::Naming(_) => "naming",
            LoadError::Dependency(_) => "dependency",
            LoadError::Conflict(_) => "conflict",
            LoadError::Placement(_) => "placement",
            LoadError::Cycle(_) => "cycle",
        }
    }
}

/// A hook id that breaks the naming convention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} hook '{hook}' (declared by {owner}) {rule}")]
pub struct NamingError {
    /// Offending id.
    pub hook: HookId,
    /// Declared kind.
    pub kind: HookKind,
    /// Declaring module.
    pub owner: String,
    /// The rule it broke.
    pub rule: NamingRule,
}

/// A reference to a hook that is missing or of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    /// An `after`/`before` entry names an undefined hook.
    #[error("turn phase '{hook}' (declared by {owner}) runs {relation} '{dependency}', which is not defined")]
    Missing {
        /// Referencing hook.
        hook: HookId,
        /// Its owner.
        owner: String,
        /// The missing id.
        dependency: HookId,
        /// `"after"` or `"before"`.
        relation: &'static str,
    },

    /// An `after`/`before` entry names an entity hook.
    #[error(
        "turn phase '{hook}' (declared by {owner}) runs {relation} '{dependency}', \
         which is an entity hook declared by {dependency_owner}"
    )]
    NotTurnPhase {
        /// Referencing hook.
        hook: HookId,
        /// Its owner.
        owner: String,
        /// The mis-kinded id.
        dependency: HookId,
        /// Owner of the mis-kinded hook.
        dependency_owner: String,
        /// `"after"` or `"before"`.
        relation: &'static str,
    },

    /// A binding names a hook nobody defines.
    #[error("{owner} binds a handler to '{hook}', which is not defined")]
    UnboundHook {
        /// The undefined hook.
        hook: HookId,
        /// Module that bound it.
        owner: String,
    },
}

/// Two incompatible declarations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    /// The same id declared with different invocation kinds.
    #[error(
        "hook '{hook}' is declared as {first_kind} by {first_owner} \
         but as {second_kind} by {second_owner}"
    )]
    InvocationKind {
        /// Conflicting id.
        hook: HookId,
        /// First declarer.
        first_owner: String,
        /// First declared kind.
        first_kind: HookKind,
        /// Second declarer.
        second_owner: String,
        /// Second declared kind.
        second_kind: HookKind,
    },

    /// The same id declared with different details.
    #[error("hook '{hook}' is declared by both {first_owner} and {second_owner}: {detail}")]
    Definition {
        /// Conflicting id.
        hook: HookId,
        /// First declarer.
        first_owner: String,
        /// Second declarer.
        second_owner: String,
        /// What differs.
        detail: String,
    },

    /// Two modules share a name.
    #[error("module '{module}' was added more than once")]
    DuplicateModule {
        /// The repeated name.
        module: String,
    },
}

/// A turn-phase hook bound to an individual entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{owner} binds turn phase '{hook}' to entity '{entity}'; \
     turn phases are global and cannot be bound per entity"
)]
pub struct PlacementError {
    /// The entity.
    pub entity: EntityId,
    /// The turn-phase hook.
    pub hook: HookId,
    /// Module that made the binding.
    pub owner: String,
}

/// The turn-phase constraints contain a cycle.
///
/// `path` is one concrete cycle, starting and ending with the same hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("turn phases form a cycle: {} (declared by {})", render_path(.path), .owners.join(", "))]
pub struct CycleError {
    /// One cycle, first element repeated at the end.
    pub path: Vec<HookId>,
    /// Owners of the hooks on the cycle.
    pub owners: Vec<String>,
    /// Every phase that could not be ordered.
    pub unresolved: Vec<HookId>,
}

fn render_path(path: &[HookId]) -> String {
    path.iter()
        .map(HookId::as_str)
        .collect::<Vec<_>>()
        .join(" → ")
}

impl CycleError {
    /// The cycle as `a → b → a`.
    #[must_use]
    pub fn rendered_path(&self) -> String {
        render_path(&self.path)
    }
}
