//! Handler bindings.

use core::fmt;

use quill_world::{EntityId, FieldGuardError};

use crate::dispatch::Invocation;
use crate::hook::{HookId, Tier};
use crate::result::HookResult;

/// Error a handler returns when it cannot complete.
///
/// Returning an error is treated the same as panicking: the dispatch that
/// invoked the handler is aborted and surfaces a failed [`HookResult`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Free-form failure.
    #[error("{0}")]
    Message(String),

    /// The handler needed an entity that does not exist.
    #[error("entity '{0}' not found")]
    MissingEntity(EntityId),

    /// A guarded property write was rejected.
    #[error(transparent)]
    FieldGuard(#[from] FieldGuardError),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] Box<dyn core::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Creates a [`HandlerError::Message`].
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}

/// Signature every handler implements.
pub type HandlerFn = dyn Fn(&mut Invocation<'_>) -> Result<HookResult, HandlerError> + Send + Sync;

/// Where a binding applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingScope {
    /// Applies to turn-phase dispatch and to every entity that attaches the
    /// owning module in its `behaviors`.
    Module,
    /// Bound directly to one entity.
    Entity(EntityId),
}

/// A handler bound to a hook by a module, at the module's tier.
pub struct EventBinding {
    hook: HookId,
    tier: Tier,
    owner: String,
    scope: BindingScope,
    handler: Box<HandlerFn>,
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("hook", &self.hook)
            .field("tier", &self.tier)
            .field("owner", &self.owner)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl EventBinding {
    /// Creates a module-scoped binding.
    pub fn new<F>(hook: impl Into<HookId>, owner: impl Into<String>, tier: Tier, handler: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> Result<HookResult, HandlerError> + Send + Sync + 'static,
    {
        Self {
            hook: hook.into(),
            tier,
            owner: owner.into(),
            scope: BindingScope::Module,
            handler: Box::new(handler),
        }
    }

    /// Restricts the binding to one entity.
    #[must_use]
    pub fn for_entity(mut self, entity: impl Into<EntityId>) -> Self {
        self.scope = BindingScope::Entity(entity.into());
        self
    }

    /// The hook this binding handles.
    #[must_use]
    pub fn hook(&self) -> &HookId {
        &self.hook
    }

    /// The binding's tier.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// The module that registered the binding.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Where the binding applies.
    #[must_use]
    pub fn scope(&self) -> &BindingScope {
        &self.scope
    }

    /// Returns true if the binding takes part in a dispatch against
    /// `entity`, whose attached modules are `behaviors`.
    #[must_use]
    pub fn applies_to(&self, entity: Option<(&EntityId, &[String])>) -> bool {
        match (&self.scope, entity) {
            (BindingScope::Module, None) => true,
            (BindingScope::Module, Some((_, behaviors))) => {
                behaviors.iter().any(|b| *b == self.owner)
            }
            (BindingScope::Entity(bound), Some((id, _))) => bound == id,
            (BindingScope::Entity(_), None) => false,
        }
    }

    pub(crate) fn call(&self, invocation: &mut Invocation<'_>) -> Result<HookResult, HandlerError> {
        (self.handler)(invocation)
    }
}
