//! A small text adventure built on Quill.
//!
//! Three modules make up the game, one per tier:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  game     lantern_story   lamp / idol overrides, events  │
//! │              │ delegate                                  │
//! │              ▼                                           │
//! │  library  light_source    entity_light, fuel burn-down   │
//! │              │                                           │
//! │              ▼                                           │
//! │  core     portable        entity_take                    │
//! │           core_turn       turn phases                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A command is a verb and a noun. The verb selects the `entity_<verb>`
//! hook, the noun names the entity it is dispatched against. Every
//! successful command ends the turn.

use quill_core_modules::{TURN_ENVIRONMENT, TURN_SCHEDULED_EVENTS};
use quill_hooks::{HookContext, HookDefinition, HookResult, Tier};
use quill_modules::{BehaviorEngine, BehaviorModule, ModuleGroup, ModuleGroupBuilder, ModuleLoader};
use quill_world::{Entity, EntityData, EntityId, FieldGuardError, GameState};
use serde_json::json;
use tracing::debug;

/// Picking something up.
pub const ENTITY_TAKE: &str = "entity_take";
/// Lighting something.
pub const ENTITY_LIGHT: &str = "entity_light";

/// Id of the player actor.
pub const PLAYER: &str = "player";

/// The commands the `lantern` binary plays through.
pub const SCRIPT: &[&str] = &[
    "look",
    "take idol",
    "light lamp",
    "take lamp",
    "wait",
    "light lamp",
    "wait",
];

// ─────────────────────────────────────────────────────────────────────────────
// Modules
// ─────────────────────────────────────────────────────────────────────────────

/// Lets the player carry items.
pub struct Portable;

impl BehaviorModule for Portable {
    fn name(&self) -> &str {
        "portable"
    }

    fn tier(&self) -> Tier {
        Tier::CORE
    }

    fn build(&self, loader: &mut ModuleLoader<'_>) {
        loader
            .define_hook(HookDefinition::entity(ENTITY_TAKE).with_description("picking something up"))
            .bind(ENTITY_TAKE, |inv| {
                let actor = actor(inv.context());
                let Some(item) = inv.entity() else {
                    return Ok(HookResult::denied("Take what?"));
                };
                if matches!(item.data, EntityData::Item { portable: false }) {
                    return Ok(HookResult::denied("That's fixed in place."));
                }
                if item.location.as_ref() == Some(&actor) {
                    return Ok(HookResult::denied("You already have that."));
                }

                let id = item.id.clone();
                Ok(HookResult::allowed()
                    .with_message("Taken.")
                    .with_effect(move |state| {
                        state.relocate(id.as_str(), Some(actor));
                    }))
            });
    }
}

/// Things that burn oil while lit.
pub struct LightSource;

impl LightSource {
    const NAME: &'static str = "light_source";
}

fn is_lit(entity: &Entity) -> bool {
    entity.property("lit").and_then(|v| v.as_bool()).unwrap_or(false)
}

fn fuel(entity: &Entity) -> u64 {
    entity.property("fuel").and_then(|v| v.as_u64()).unwrap_or(0)
}

impl BehaviorModule for LightSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn build(&self, loader: &mut ModuleLoader<'_>) {
        loader
            .define_hook(HookDefinition::entity(ENTITY_LIGHT).with_description("lighting something"))
            .bind(ENTITY_LIGHT, |inv| {
                let Some(source) = inv.entity() else {
                    return Ok(HookResult::denied("Light what?"));
                };
                let name = source.name.clone();
                if is_lit(source) {
                    return Ok(HookResult::denied(format!("The {name} is already lit.")));
                }
                if fuel(source) == 0 {
                    return Ok(HookResult::denied(format!("The {name} is out of oil.")));
                }

                if let Some(source) = inv.entity_mut() {
                    source.properties_mut().insert("lit", true)?;
                }
                Ok(HookResult::allowed().with_message(format!("The {name} flickers to life.")))
            })
            .bind(TURN_ENVIRONMENT, |inv| {
                let burning: Vec<EntityId> = inv
                    .state()
                    .entities()
                    .filter(|e| e.has_behavior(Self::NAME) && is_lit(e))
                    .map(|e| e.id.clone())
                    .collect();

                let mut messages = Vec::new();
                for id in burning {
                    let Some(source) = inv.state_mut().entity_mut(id.as_str()) else {
                        continue;
                    };
                    let name = source.name.clone();
                    let remaining = fuel(source).saturating_sub(1);
                    let mut properties = source.properties_mut();
                    properties.insert("fuel", remaining)?;
                    if remaining == 0 {
                        properties.insert("lit", false)?;
                        messages.push(format!("The {name} gutters out."));
                    }
                }

                Ok(if messages.is_empty() {
                    HookResult::allowed()
                } else {
                    HookResult::allowed().with_message(messages.join(" "))
                })
            });
    }
}

/// Story-specific behavior layered over the library modules.
pub struct LanternStory;

impl BehaviorModule for LanternStory {
    fn name(&self) -> &str {
        "lantern_story"
    }

    fn tier(&self) -> Tier {
        Tier::GAME
    }

    fn build(&self, loader: &mut ModuleLoader<'_>) {
        loader
            .bind_entity("lamp", ENTITY_TAKE, |inv| {
                let mut below = inv.delegate();
                if below.allow {
                    let note = "Its brass is cold to the touch.";
                    below.message = Some(match below.message.take() {
                        Some(message) => format!("{message} {note}"),
                        None => note.to_owned(),
                    });
                }
                Ok(below)
            })
            .bind_entity("idol", ENTITY_TAKE, |_| {
                Ok(HookResult::denied(
                    "The idol will not budge. Something beneath the floor holds it.",
                ))
            })
            .bind(TURN_SCHEDULED_EVENTS, |inv| {
                Ok(if inv.state().turn == 1 {
                    HookResult::allowed().with_message("Somewhere above, a door slams shut.")
                } else {
                    HookResult::allowed()
                })
            });
    }
}

/// The game's own modules, loaded after the infrastructure modules.
pub struct LanternGame;

impl ModuleGroup for LanternGame {
    fn build(self) -> ModuleGroupBuilder {
        ModuleGroupBuilder::new()
            .add(Portable)
            .add(LightSource)
            .add(LanternStory)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// World
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the starting world: a cellar, the player, an oil lamp and an idol.
pub fn world() -> Result<GameState, FieldGuardError> {
    let mut state = GameState::new();

    state.spawn(
        Entity::location("cellar", "Cellar")
            .with_description("A damp cellar. Water seeps between the stones."),
    )?;
    state.spawn(Entity::actor(PLAYER, "you").with_location("cellar"))?;

    let mut lamp = Entity::item("lamp", "lamp")
        .with_location("cellar")
        .with_behavior("portable")
        .with_behavior(LightSource::NAME);
    lamp.properties_mut().insert("fuel", 2)?;
    state.spawn(lamp)?;

    let mut idol = Entity::item("idol", "idol")
        .with_location("cellar")
        .with_behavior("portable");
    idol.properties_mut().insert("cursed", true)?;
    state.spawn(idol)?;

    Ok(state)
}

fn actor(context: &HookContext) -> EntityId {
    EntityId::new(
        context
            .get("actor")
            .and_then(|v| v.as_str())
            .unwrap_or(PLAYER),
    )
}

fn find<'a>(state: &'a GameState, noun: &str) -> Option<&'a Entity> {
    state
        .entities()
        .find(|e| e.name.eq_ignore_ascii_case(noun) || e.id.as_str() == noun)
}

fn look(state: &GameState) -> Vec<String> {
    let Some(here) = state.entity(PLAYER).and_then(|p| p.location.as_ref()) else {
        return vec!["You are nowhere.".to_owned()];
    };
    let Some(room) = state.entity(here.as_str()) else {
        return vec!["You are nowhere.".to_owned()];
    };

    let mut lines = vec![room.name.clone(), room.description.clone()];
    let items: Vec<_> = state
        .entities_in(here.as_str())
        .filter(|e| e.id.as_str() != PLAYER)
        .map(|e| e.name.as_str())
        .collect();
    if !items.is_empty() {
        lines.push(format!("You see: {}.", items.join(", ")));
    }
    lines
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Plays one command and returns what the player reads.
///
/// `look` costs no turn. `wait` and every command the world understood end
/// the turn; narration from the turn phases follows the command's own.
pub fn perform(engine: &BehaviorEngine, state: &mut GameState, command: &str) -> Vec<String> {
    let mut words = command.split_whitespace();
    let (Some(verb), noun) = (words.next(), words.next()) else {
        return vec!["Beg pardon?".to_owned()];
    };

    let mut context = HookContext::new();
    context.insert("actor".to_owned(), json!(PLAYER));

    let mut lines = Vec::new();
    match (verb, noun) {
        ("look", _) => return look(state),
        ("wait", _) => lines.push("Time passes.".to_owned()),
        (verb, Some(noun)) => {
            let hook = format!("entity_{verb}");
            if !engine.registry().contains(&hook) {
                return vec![format!("I don't know how to {verb} things.")];
            }
            let Some(target) = find(state, noun).map(|e| e.id.clone()) else {
                return vec![format!("You see no {noun} here.")];
            };

            debug!(target: "lantern", %hook, entity = %target, "command");
            let mut result = engine.dispatch(Some(&target), &hook, state, &context);
            let fallback = if result.allow { "Done." } else { "You can't do that." };
            lines.push(result.message.take().unwrap_or_else(|| fallback.to_owned()));
            if !result.allow {
                return lines;
            }
            result.apply_deferred(state);
        }
        (verb, None) => return vec![format!("What do you want to {verb}?")],
    }

    for record in engine.end_turn(state, &context) {
        lines.extend(record.result.message);
    }
    lines
}
