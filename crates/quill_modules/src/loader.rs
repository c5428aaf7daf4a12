//! The build-time handle a module declares hooks and bindings through.

use quill_hooks::error::ConflictError;
use quill_hooks::{
    EventBinding, HandlerError, HookDefinition, HookId, HookRegistry, HookResult, Invocation,
    Tier,
};
use quill_world::EntityId;
use tracing::{debug, error};

/// Passed to [`BehaviorModule::build`](crate::BehaviorModule::build).
///
/// Every definition is stamped with the module as owner and every binding
/// with the module's name and tier. Conflicting definitions are not fatal
/// here; they are collected and reported by validation with everything else.
pub struct ModuleLoader<'c> {
    module: &'c str,
    tier: Tier,
    registry: &'c mut HookRegistry,
    conflicts: &'c mut Vec<ConflictError>,
}

impl<'c> ModuleLoader<'c> {
    pub(crate) fn new(
        module: &'c str,
        tier: Tier,
        registry: &'c mut HookRegistry,
        conflicts: &'c mut Vec<ConflictError>,
    ) -> Self {
        Self {
            module,
            tier,
            registry,
            conflicts,
        }
    }

    /// Name of the module being built.
    #[must_use]
    pub fn module(&self) -> &str {
        self.module
    }

    /// Tier every binding of this module gets.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Declares a hook owned by this module.
    pub fn define_hook(&mut self, definition: HookDefinition) -> &mut Self {
        let definition = definition.owned_by(self.module);
        if let Err(conflict) = self.registry.register(definition) {
            error!(target: "quill::catalog", module = self.module, "{conflict}");
            self.conflicts.push(conflict);
        }
        self
    }

    /// Declares a turn phase with its `after` dependencies.
    pub fn define_turn_phase<I, S>(&mut self, id: impl Into<HookId>, after: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<HookId>,
    {
        let definition = after
            .into_iter()
            .fold(HookDefinition::turn_phase(id), HookDefinition::after);
        self.define_hook(definition)
    }

    /// Binds a handler to `hook`. It runs for turn phases, and for entity
    /// hooks on every entity that attaches this module.
    pub fn bind<F>(&mut self, hook: impl Into<HookId>, handler: F) -> &mut Self
    where
        F: Fn(&mut Invocation<'_>) -> Result<HookResult, HandlerError> + Send + Sync + 'static,
    {
        self.registry
            .bind(EventBinding::new(hook, self.module, self.tier, handler));
        self
    }

    /// Binds a handler to `hook` for one entity only, whether or not the
    /// entity attaches this module.
    pub fn bind_entity<F>(
        &mut self,
        entity: impl Into<EntityId>,
        hook: impl Into<HookId>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&mut Invocation<'_>) -> Result<HookResult, HandlerError> + Send + Sync + 'static,
    {
        let entity = entity.into();
        debug!(target: "quill::catalog", module = self.module, entity = %entity, "per-entity binding");
        self.registry
            .bind(EventBinding::new(hook, self.module, self.tier, handler).for_entity(entity));
        self
    }

    /// Read access to what has been declared so far, by this module and the
    /// modules loaded before it.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        self.registry
    }
}
