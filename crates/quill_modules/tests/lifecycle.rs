//! Tests for the module load lifecycle.
//!
//! These tests verify:
//! - Build and ready order
//! - Validation failures abort loading
//! - Shared and conflicting declarations across modules
//! - Turns and dispatches through the frozen engine

use std::sync::{Arc, Mutex};

use quill_hooks::{HookContext, HookDefinition, HookResult, Tier};
use quill_modules::prelude::*;
use quill_world::{Entity, EntityId, GameState};
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Test Modules
// ─────────────────────────────────────────────────────────────────────────────

struct Clock;

impl BehaviorModule for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn tier(&self) -> Tier {
        Tier::CORE
    }

    fn build(&self, loader: &mut ModuleLoader<'_>) {
        loader
            .define_turn_phase("turn_environment", ["turn_npc_actions"])
            .define_turn_phase("turn_npc_actions", Vec::<&str>::new());
    }
}

struct Lockable;

impl BehaviorModule for Lockable {
    fn name(&self) -> &str {
        "lockable"
    }

    fn build(&self, loader: &mut ModuleLoader<'_>) {
        loader
            .define_hook(HookDefinition::entity("entity_open").with_description("opening"))
            .bind("entity_open", |inv| {
                let locked = inv
                    .entity()
                    .and_then(|e| e.property("locked"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                Ok(if locked {
                    HookResult::denied("It's locked.")
                } else {
                    HookResult::allowed().with_message("It opens.")
                })
            });
    }
}

/// Declares the same `entity_open` as `Lockable` and adds an override for one door.
struct Story;

impl BehaviorModule for Story {
    fn name(&self) -> &str {
        "story"
    }

    fn tier(&self) -> Tier {
        Tier::GAME
    }

    fn build(&self, loader: &mut ModuleLoader<'_>) {
        loader
            .define_hook(HookDefinition::entity("entity_open").with_description("opening"))
            .bind_entity("vault", "entity_open", |inv| {
                let below = inv.delegate();
                if below.allow {
                    return Ok(below);
                }
                Ok(HookResult::denied("The vault door hums. A keypad glows."))
            })
            .bind("turn_environment", |inv| {
                let state = inv.state_mut();
                let drips = state.globals.get("drips").and_then(|v| v.as_u64()).unwrap_or(0);
                state.globals.insert("drips".into(), json!(drips + 1));
                Ok(HookResult::allowed().with_message("Water drips."))
            });
    }
}

#[derive(Clone, Default)]
struct ReadyLog(Arc<Mutex<Vec<String>>>);

struct Recorder {
    name: &'static str,
    log: ReadyLog,
}

impl BehaviorModule for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn build(&self, _loader: &mut ModuleLoader<'_>) {
        self.log.0.lock().unwrap().push(format!("build {}", self.name));
    }

    fn ready(&self, engine: &BehaviorEngine) {
        assert!(engine.has_module(self.name));
        self.log.0.lock().unwrap().push(format!("ready {}", self.name));
    }
}

fn world() -> GameState {
    let mut state = GameState::new();
    let mut vault = Entity::location("vault", "Vault").with_behavior("lockable");
    vault.properties_mut().insert("locked", json!(true)).unwrap();
    let mut shed = Entity::location("shed", "Shed").with_behavior("lockable");
    shed.properties_mut().insert("locked", json!(true)).unwrap();
    state.spawn(vault).unwrap();
    state.spawn(shed).unwrap();
    state
}

fn load(build: impl FnOnce(&mut BehaviorCatalog)) -> BehaviorEngine {
    let mut catalog = BehaviorCatalog::new();
    build(&mut catalog);
    catalog.finalize_loading().unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn build_then_ready_in_load_order() {
    let log = ReadyLog::default();
    let group = ModuleGroupBuilder::new()
        .add(Recorder { name: "b", log: log.clone() })
        .add_before::<_, Recorder>(Recorder { name: "a", log: log.clone() });

    let engine = load(|catalog| {
        catalog.add_modules(group);
    });

    assert_eq!(
        *log.0.lock().unwrap(),
        ["build a", "build b", "ready a", "ready b"]
    );
    let names: Vec<_> = engine.modules().map(|(name, _)| name).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn identical_declarations_from_two_modules_are_shared() {
    let engine = load(|catalog| {
        catalog
            .add_modules(Clock)
            .add_modules(Lockable)
            .add_modules(Story);
    });

    let owners: Vec<_> = engine.registry().owners_of("entity_open").collect();
    assert_eq!(owners, ["lockable", "story"]);
}

#[test]
fn ready_is_skipped_when_loading_fails() {
    struct Broken;
    impl BehaviorModule for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn build(&self, loader: &mut ModuleLoader<'_>) {
            loader.define_turn_phase("turn_a", ["turn_b"]).define_turn_phase("turn_b", ["turn_a"]);
        }
    }

    let log = ReadyLog::default();
    let mut catalog = BehaviorCatalog::new();
    catalog
        .add_modules(Recorder { name: "rec", log: log.clone() })
        .add_modules(Broken);

    let err = catalog.finalize_loading().unwrap_err();
    assert_eq!(err.category(), "cycle");
    assert!(err.to_string().contains("turn_a → turn_b → turn_a"));
    assert!(err.to_string().contains("broken"));
    assert_eq!(*log.0.lock().unwrap(), ["build rec"]);
}

#[test]
fn conflicting_kinds_across_modules_abort_loading() {
    struct OpenPhase;
    impl BehaviorModule for OpenPhase {
        fn name(&self) -> &str {
            "open_phase"
        }
        fn build(&self, loader: &mut ModuleLoader<'_>) {
            loader.define_hook(HookDefinition::turn_phase("entity_open"));
        }
    }

    let mut catalog = BehaviorCatalog::new();
    catalog.add_modules(Lockable).add_modules(OpenPhase);
    let err = catalog.finalize_loading().unwrap_err();

    // The mis-named turn phase never made it into the registry, so the
    // conflict is what gets reported.
    assert_eq!(err.category(), "conflict");
    let msg = err.to_string();
    assert!(msg.contains("lockable"));
    assert!(msg.contains("open_phase"));
}

#[test]
fn module_changing_its_own_hook_kind_aborts_loading() {
    struct Fickle;
    impl BehaviorModule for Fickle {
        fn name(&self) -> &str {
            "fickle"
        }
        fn build(&self, loader: &mut ModuleLoader<'_>) {
            loader
                .define_hook(HookDefinition::entity("entity_open"))
                .define_hook(HookDefinition::turn_phase("entity_open"));
        }
    }

    let mut catalog = BehaviorCatalog::new();
    catalog.add_modules(Fickle);
    let err = catalog.finalize_loading().unwrap_err();

    assert_eq!(err.category(), "conflict");
    let msg = err.to_string();
    assert!(msg.contains("'entity_open'"));
    assert!(msg.contains("fickle"));
}

#[test]
fn per_entity_turn_phase_binding_is_misplaced() {
    struct Haunting;
    impl BehaviorModule for Haunting {
        fn name(&self) -> &str {
            "haunting"
        }
        fn build(&self, loader: &mut ModuleLoader<'_>) {
            loader.bind_entity("shed", "turn_environment", |_| Ok(HookResult::allowed()));
        }
    }

    let mut catalog = BehaviorCatalog::new();
    catalog.add_modules(Clock).add_modules(Haunting);
    let err = catalog.finalize_loading().unwrap_err();

    assert_eq!(err.category(), "placement");
    assert!(err.to_string().contains("'shed'"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Play
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn end_turn_runs_phases_and_advances_the_counter() {
    let engine = load(|catalog| {
        catalog
            .add_modules(Clock)
            .add_modules(Lockable)
            .add_modules(Story);
    });
    let mut state = world();

    let records = engine.end_turn(&mut state, &HookContext::new());
    let phases: Vec<_> = records.iter().map(|r| r.hook.as_str()).collect();
    assert_eq!(phases, ["turn_npc_actions", "turn_environment"]);
    assert!(records[0].result.message.is_none());
    assert_eq!(records[1].result.message.as_deref(), Some("Water drips."));
    assert_eq!(state.turn, 1);

    let _ = engine.end_turn(&mut state, &HookContext::new());
    assert_eq!(state.turn, 2);
    assert_eq!(state.globals.get("drips"), Some(&json!(2)));
}

#[test]
fn entity_override_delegates_to_attached_module() {
    let engine = load(|catalog| {
        catalog
            .add_modules(Clock)
            .add_modules(Lockable)
            .add_modules(Story);
    });
    let mut state = world();
    let context = HookContext::new();

    let vault = engine.dispatch(Some(&EntityId::new("vault")), "entity_open", &mut state, &context);
    assert!(!vault.allow);
    assert_eq!(vault.message.as_deref(), Some("The vault door hums. A keypad glows."));

    let shed = engine.dispatch(Some(&EntityId::new("shed")), "entity_open", &mut state, &context);
    assert!(!shed.allow);
    assert_eq!(shed.message.as_deref(), Some("It's locked."));

    state
        .entity_mut("vault")
        .unwrap()
        .properties_mut()
        .insert("locked", json!(false))
        .unwrap();
    let vault = engine.dispatch(Some(&EntityId::new("vault")), "entity_open", &mut state, &context);
    assert!(vault.allow);
    assert_eq!(vault.message.as_deref(), Some("It opens."));
}
