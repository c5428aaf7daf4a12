//! Tests for the behavior dispatcher.
//!
//! These tests verify:
//! - Composition of independently attached handlers
//! - Tiered delegation and its exhaustion
//! - Binding scope (attached modules, per-entity bindings)
//! - Fault isolation and the inconsistent-state marker
//! - Deferred effects and cascading dispatches


use quill_hooks::prelude::*;
use quill_world::EntityId;
use serde_json::json;
use test_utils::{CallLog, bind_recording, bind_verdict, cellar, dispatcher, no_context};

fn entity_hook(registry: &mut HookRegistry, id: &str) {
    registry
        .register(HookDefinition::entity(id).owned_by("test"))
        .unwrap();
}

fn idol() -> EntityId {
    EntityId::new("idol")
}

// ─────────────────────────────────────────────────────────────────────────────
// Composition
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn attached_handlers_all_run_and_compose() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    bind_verdict(&mut registry, "entity_take", "cursed", Tier::LIBRARY, true, "X");
    bind_verdict(&mut registry, "entity_take", "heavy", Tier::LIBRARY, false, "Y");

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert_eq!(result.message.as_deref(), Some("X Y"));
    assert!(!result.faulted);
}

#[test]
fn group_order_follows_owner_name_not_registration() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    bind_verdict(&mut registry, "entity_take", "heavy", Tier::LIBRARY, true, "second");
    bind_verdict(&mut registry, "entity_take", "cursed", Tier::LIBRARY, true, "first");

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert_eq!(result.message.as_deref(), Some("first second"));
}

#[test]
fn denial_does_not_short_circuit_the_group() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    let log = CallLog::default();
    bind_verdict(&mut registry, "entity_take", "cursed", Tier::LIBRARY, false, "No.");
    bind_recording(&mut registry, "entity_take", "heavy", Tier::LIBRARY, &log);

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert_eq!(log.entries(), ["heavy"]);
}

#[test]
fn hook_without_handlers_allows_silently() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_smell");

    let dispatcher = dispatcher(registry);
    let mut state = cellar();
    for hook in ["entity_smell", "entity_never_defined"] {
        let result = dispatcher.dispatch(Some(&idol()), hook, &mut state, &no_context());
        assert!(result.allow);
        assert!(result.message.is_none());
        assert!(!result.faulted);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delegation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn only_the_top_tier_runs_by_default() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    let log = CallLog::default();
    bind_recording(&mut registry, "entity_take", "cursed", Tier::GAME, &log);
    bind_recording(&mut registry, "entity_take", "heavy", Tier::LIBRARY, &log);

    let _ = dispatcher(registry).dispatch(Some(&idol()), "entity_take", &mut cellar(), &no_context());

    assert_eq!(log.entries(), ["cursed"]);
}

#[test]
fn delegation_walks_down_every_tier() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::GAME, |inv| {
        let below = inv.delegate();
        Ok(HookResult::allowed().with_message(format!(
            "game({})",
            below.message.unwrap_or_default()
        )))
    }));
    registry.bind(EventBinding::new("entity_take", "heavy", Tier::LIBRARY, |inv| {
        let below = inv.delegate();
        Ok(HookResult::allowed().with_message(format!(
            "library({})",
            below.message.unwrap_or_default()
        )))
    }));
    registry.bind(
        EventBinding::new("entity_take", "story", Tier::CORE, |_| {
            Ok(HookResult::allowed().with_message("core"))
        })
        .for_entity("idol"),
    );

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert_eq!(result.message.as_deref(), Some("game(library(core))"));
}

#[test]
fn exhausted_delegation_is_a_denial_not_a_fault() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |inv| {
        assert!(!inv.can_delegate());
        Ok(inv.delegate())
    }));

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert!(!result.faulted);
    assert!(result.message.unwrap().contains("no further handler exists"));
}

#[test]
fn each_lower_tier_runs_at_most_once_per_dispatch() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    let log = CallLog::default();
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::GAME, |inv| {
        let first = inv.delegate();
        let second = inv.delegate();
        assert!(!inv.can_delegate());
        Ok(HookResult::compose([first, second]))
    }));
    registry.bind(EventBinding::new("entity_take", "heavy", Tier::LIBRARY, |inv| {
        Ok(inv.delegate())
    }));
    let log_for_idol = log.clone();
    registry.bind(
        EventBinding::new("entity_take", "story", Tier::CORE, move |_| {
            log_for_idol.record("core");
            Ok(HookResult::allowed().with_message("core"))
        })
        .for_entity("idol"),
    );

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert_eq!(log.entries(), ["core"]);
    assert!(!result.allow);
    assert!(!result.faulted);
    let message = result.message.unwrap();
    assert!(message.starts_with("core "));
    assert!(message.contains("no further handler exists"));
}

#[test]
fn delegated_group_composes_its_own_handlers() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(
        EventBinding::new("entity_take", "story", Tier::GAME, |inv| Ok(inv.delegate()))
            .for_entity("idol"),
    );
    bind_verdict(&mut registry, "entity_take", "cursed", Tier::LIBRARY, true, "Cold.");
    bind_verdict(&mut registry, "entity_take", "heavy", Tier::LIBRARY, false, "Too heavy.");

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert_eq!(result.message.as_deref(), Some("Cold. Too heavy."));
}

#[test]
fn nested_dispatch_keeps_its_own_stack() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    entity_hook(&mut registry, "entity_examine");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::GAME, |inv| {
        let lamp = EntityId::new("lamp");
        let looked = inv.dispatch(Some(&lamp), "entity_examine");
        let below = inv.delegate();
        Ok(HookResult::compose([looked, below]))
    }));
    bind_verdict(&mut registry, "entity_take", "heavy", Tier::LIBRARY, true, "Heavy.");
    bind_verdict(&mut registry, "entity_examine", "lightable", Tier::GAME, true, "A lamp.");

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert_eq!(result.message.as_deref(), Some("A lamp. Heavy."));
}

// ─────────────────────────────────────────────────────────────────────────────
// Scope
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn module_bindings_need_the_module_attached() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    let log = CallLog::default();
    bind_recording(&mut registry, "entity_take", "cursed", Tier::LIBRARY, &log);

    let dispatcher = dispatcher(registry);
    let mut state = cellar();
    let _ = dispatcher.dispatch(Some(&"lamp".into()), "entity_take", &mut state, &no_context());
    assert!(log.entries().is_empty());

    let _ = dispatcher.dispatch(Some(&idol()), "entity_take", &mut state, &no_context());
    assert_eq!(log.entries(), ["cursed"]);
}

#[test]
fn entity_bindings_apply_only_to_their_entity() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(
        EventBinding::new("entity_take", "story", Tier::GAME, |inv| {
            Ok(HookResult::denied(format!(
                "The {} is nailed down.",
                inv.entity().map_or("thing", |e| e.name.as_str())
            )))
        })
        .for_entity("lamp"),
    );

    let dispatcher = dispatcher(registry);
    let mut state = cellar();

    let lamp = dispatcher.dispatch(Some(&"lamp".into()), "entity_take", &mut state, &no_context());
    assert_eq!(lamp.message.as_deref(), Some("The brass lamp is nailed down."));

    let idol = dispatcher.dispatch(Some(&idol()), "entity_take", &mut state, &no_context());
    assert!(idol.allow);
}

#[test]
fn missing_entity_fails_the_dispatch() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");

    let result = dispatcher(registry).dispatch(
        Some(&"ghost".into()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert!(result.message.unwrap().contains("'ghost'"));
}

#[test]
fn turn_phase_cannot_target_an_entity() {
    let mut registry = HookRegistry::new();
    registry
        .register(HookDefinition::turn_phase("turn_environment").owned_by("weather"))
        .unwrap();

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "turn_environment",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert!(result.message.unwrap().contains("turn_environment"));
}

#[test]
fn context_reaches_handlers() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |inv| {
        let actor = inv.context().get("actor").and_then(|v| v.as_str()).unwrap_or("?");
        Ok(HookResult::allowed().with_message(format!("{actor} shivers.")))
    }));

    let mut context = no_context();
    context.insert("actor".into(), json!("player"));
    let result = dispatcher(registry).dispatch(Some(&idol()), "entity_take", &mut cellar(), &context);

    assert_eq!(result.message.as_deref(), Some("player shivers."));
}

// ─────────────────────────────────────────────────────────────────────────────
// Faults
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn handler_error_becomes_a_failed_result() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    let log = CallLog::default();
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |_| {
        Err(HandlerError::msg("curse table missing"))
    }));
    bind_recording(&mut registry, "entity_take", "heavy", Tier::LIBRARY, &log);

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert!(result.faulted);
    assert!(!result.inconsistent_state);
    let message = result.message.unwrap();
    assert!(message.contains("cursed"));
    assert!(message.contains("curse table missing"));
    assert!(log.entries().is_empty(), "the rest of the dispatch is aborted");
}

#[test]
fn panic_after_mutation_is_marked_inconsistent() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |inv| {
        inv.state_mut().relocate("idol", Some("player".into()));
        panic!("curse misfired");
    }));

    let dispatcher = dispatcher(registry);
    let mut state = cellar();
    let result = dispatcher.dispatch(Some(&idol()), "entity_take", &mut state, &no_context());

    assert!(result.faulted);
    assert!(result.inconsistent_state);
    assert!(result.message.unwrap().contains("curse misfired"));

    // The session survives and the partial mutation is visible.
    assert!(state.entity("idol").is_some());
    let again = dispatcher.dispatch(Some(&idol()), "entity_take", &mut state, &no_context());
    assert!(again.faulted);
}

#[test]
fn fault_below_a_delegation_surfaces_through_it() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::GAME, |inv| {
        inv.entity_mut()
            .ok_or_else(|| HandlerError::MissingEntity("idol".into()))?
            .properties_mut()
            .insert("touched", json!(true))?;
        Ok(inv.delegate())
    }));
    registry.bind(EventBinding::new("entity_take", "heavy", Tier::LIBRARY, |_| {
        Err(HandlerError::msg("scale broke"))
    }));

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(result.faulted);
    assert!(result.inconsistent_state, "the delegating handler mutated first");
    assert!(result.message.unwrap().contains("scale broke"));
}

#[test]
fn fault_below_a_delegation_cannot_be_swallowed() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::GAME, |inv| {
        let below = inv.delegate();
        assert!(below.faulted);
        Ok(HookResult::allowed())
    }));
    registry.bind(EventBinding::new("entity_take", "heavy", Tier::LIBRARY, |_| {
        Err(HandlerError::msg("scale broke"))
    }));

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(!result.allow);
    assert!(result.faulted);
    assert!(!result.inconsistent_state);
    assert!(result.message.unwrap().contains("scale broke"));
}

#[test]
fn fault_two_tiers_down_reaches_the_top_and_keeps_the_mutation_marker() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    let log = CallLog::default();
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::GAME, |inv| {
        inv.state_mut().relocate("idol", Some("player".into()));
        let _ = inv.delegate();
        Ok(HookResult::allowed().with_message("You take the idol."))
    }));
    registry.bind(EventBinding::new("entity_take", "heavy", Tier::LIBRARY, |inv| {
        let _ = inv.delegate();
        Ok(HookResult::allowed())
    }));
    registry.bind(
        EventBinding::new("entity_take", "story", Tier::CORE, |_| {
            panic!("trapdoor jammed")
        })
        .for_entity("idol"),
    );
    bind_recording(&mut registry, "entity_take", "cursed", Tier::GAME, &log);

    let mut state = cellar();
    let result =
        dispatcher(registry).dispatch(Some(&idol()), "entity_take", &mut state, &no_context());

    assert!(result.faulted);
    assert!(result.inconsistent_state);
    assert!(result.message.unwrap().contains("trapdoor jammed"));
    assert!(log.entries().is_empty(), "the rest of the top group is aborted");
    assert_eq!(
        state.entity("idol").unwrap().location.as_ref().map(EntityId::as_str),
        Some("player")
    );
}

#[test]
fn guarded_write_error_is_a_fault() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |inv| {
        let idol = inv
            .entity_mut()
            .ok_or_else(|| HandlerError::MissingEntity("idol".into()))?;
        idol.properties_mut().insert("location", json!("void"))?;
        Ok(HookResult::allowed())
    }));

    let result = dispatcher(registry).dispatch(
        Some(&idol()),
        "entity_take",
        &mut cellar(),
        &no_context(),
    );

    assert!(result.faulted);
    assert!(result.inconsistent_state);
    assert!(result.message.unwrap().contains("'location'"));
}

#[test]
#[should_panic(expected = "curse misfired")]
fn panics_propagate_when_catching_is_off() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |_| {
        panic!("curse misfired")
    }));

    let _ = dispatcher(registry)
        .with_catch_panics(false)
        .dispatch(Some(&idol()), "entity_take", &mut cellar(), &no_context());
}

// ─────────────────────────────────────────────────────────────────────────────
// Deferred effects
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn deferred_effects_run_only_when_the_caller_applies_them() {
    let mut registry = HookRegistry::new();
    entity_hook(&mut registry, "entity_take");
    registry.bind(EventBinding::new("entity_take", "cursed", Tier::LIBRARY, |_| {
        Ok(HookResult::allowed().with_effect(|state| {
            state.relocate("idol", Some("player".into()));
        }))
    }));

    let mut state = cellar();
    let mut result =
        dispatcher(registry).dispatch(Some(&idol()), "entity_take", &mut state, &no_context());
    assert_eq!(
        state.entity("idol").and_then(|e| e.location.as_ref()).map(EntityId::as_str),
        Some("cellar")
    );

    assert!(result.apply_deferred(&mut state));
    assert_eq!(
        state.entity("idol").and_then(|e| e.location.as_ref()).map(EntityId::as_str),
        Some("player")
    );
    assert!(!result.apply_deferred(&mut state));
}
