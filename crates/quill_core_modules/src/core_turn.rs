//! The conventional end-of-turn phases.

use quill_hooks::Tier;
use quill_modules::{BehaviorModule, ModuleLoader};

/// Non-player characters act.
pub const TURN_NPC_ACTIONS: &str = "turn_npc_actions";
/// The world reacts: weather, light sources burning down, water rising.
pub const TURN_ENVIRONMENT: &str = "turn_environment";
/// Timers and scripted events fire.
pub const TURN_SCHEDULED_EVENTS: &str = "turn_scheduled_events";
/// Bookkeeping once everything else has run.
pub const TURN_CLEANUP: &str = "turn_cleanup";

/// Declares the core turn phases and binds nothing to them.
///
/// | Phase | Runs after |
/// |-------|------------|
/// | `turn_npc_actions` | - |
/// | `turn_environment` | `turn_npc_actions` |
/// | `turn_scheduled_events` | `turn_environment` |
/// | `turn_cleanup` | every other core phase |
///
/// Game modules bind handlers to these phases, or declare their own phases
/// relative to them.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreTurnModule;

impl BehaviorModule for CoreTurnModule {
    fn name(&self) -> &str {
        "core_turn"
    }

    fn tier(&self) -> Tier {
        Tier::CORE
    }

    fn build(&self, loader: &mut ModuleLoader<'_>) {
        loader
            .define_turn_phase(TURN_NPC_ACTIONS, Vec::<&str>::new())
            .define_turn_phase(TURN_ENVIRONMENT, [TURN_NPC_ACTIONS])
            .define_turn_phase(TURN_SCHEDULED_EVENTS, [TURN_ENVIRONMENT])
            .define_turn_phase(
                TURN_CLEANUP,
                [TURN_NPC_ACTIONS, TURN_ENVIRONMENT, TURN_SCHEDULED_EVENTS],
            );
    }
}
