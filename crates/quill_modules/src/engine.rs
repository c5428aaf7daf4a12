//! The frozen, playable result of loading.

use quill_hooks::{
    BehaviorDispatcher, HookContext, HookId, HookRegistry, HookResult, PhaseRecord, Tier,
    TurnPhaseScheduler,
};
use quill_world::{EntityId, GameState};
use tracing::{debug, warn};

/// Dispatches hooks and runs turns against a validated registry.
///
/// Produced by [`BehaviorCatalog::finalize_loading`](crate::BehaviorCatalog::finalize_loading).
/// Nothing about it changes for the rest of the session; a different set of
/// modules needs a fresh load.
#[derive(Debug)]
pub struct BehaviorEngine {
    dispatcher: BehaviorDispatcher,
    scheduler: TurnPhaseScheduler,
    modules: Vec<(String, Tier)>,
}

impl BehaviorEngine {
    pub(crate) fn new(
        dispatcher: BehaviorDispatcher,
        scheduler: TurnPhaseScheduler,
        modules: Vec<(String, Tier)>,
    ) -> Self {
        Self {
            dispatcher,
            scheduler,
            modules,
        }
    }

    /// Dispatches `hook` against `entity`, or globally when `entity` is
    /// `None`.
    pub fn dispatch(
        &self,
        entity: Option<&EntityId>,
        hook: &str,
        state: &mut GameState,
        context: &HookContext,
    ) -> HookResult {
        self.dispatcher.dispatch(entity, hook, state, context)
    }

    /// Runs every turn phase once, in the cached order, then advances the
    /// turn counter.
    ///
    /// Narration is left to the caller; the records come back in phase
    /// order.
    pub fn end_turn(&self, state: &mut GameState, context: &HookContext) -> Vec<PhaseRecord> {
        let records = self.scheduler.execute(&self.dispatcher, state, context);

        for record in records.iter().filter(|r| r.result.inconsistent_state) {
            warn!(
                target: "quill::schedule",
                turn = state.turn,
                phase = %record.hook,
                "turn phase failed after mutating state; state may be partially updated"
            );
        }

        state.turn += 1;
        debug!(target: "quill::schedule", turn = state.turn, phases = records.len(), "turn ended");
        records
    }

    /// The turn-phase order computed at load time.
    #[must_use]
    pub fn turn_order(&self) -> &[HookId] {
        self.scheduler.order()
    }

    /// Read-only view of every hook and binding.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        self.dispatcher.registry()
    }

    /// The underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &BehaviorDispatcher {
        &self.dispatcher
    }

    /// Loaded module names and tiers, in load order.
    pub fn modules(&self) -> impl Iterator<Item = (&str, Tier)> {
        self.modules.iter().map(|(name, tier)| (name.as_str(), *tier))
    }

    /// Returns true if a module with this name was loaded.
    #[must_use]
    pub fn has_module(&self, name: &str) -> bool {
        self.modules.iter().any(|(loaded, _)| loaded == name)
    }
}
