//! Hook registry: definitions and bindings.
//!
//! The registry is mutable while modules load and frozen afterwards; the
//! dispatcher and scheduler only ever see it through a shared reference.

use indexmap::IndexMap;
use quill_world::EntityId;
use tracing::{debug, warn};

use crate::binding::{BindingScope, EventBinding};
use crate::error::ConflictError;
use crate::hook::{HookDefinition, HookId, HookKind};

/// What [`HookRegistry::register`] did with a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First declaration of this id.
    Added,
    /// Same owner declared the id again; nothing changed.
    Unchanged,
    /// Another owner declared the identical definition; recorded as a
    /// co-declarer.
    Shared,
}

struct DefinitionEntry {
    definition: HookDefinition,
    co_owners: Vec<String>,
}

/// Stores hook definitions and handler bindings.
#[derive(Default)]
pub struct HookRegistry {
    definitions: IndexMap<HookId, DefinitionEntry>,
    bindings: IndexMap<HookId, Vec<EventBinding>>,
}

impl core::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("bindings", &self.binding_count())
            .finish()
    }
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook definition.
    ///
    /// Re-registration by the same owner is a no-op unless it changes the
    /// invocation kind. A different owner may re-declare an identical
    /// definition; any difference is a conflict naming both owners.
    pub fn register(&mut self, definition: HookDefinition) -> Result<Registration, ConflictError> {
        let Some(entry) = self.definitions.get_mut(&definition.id) else {
            debug!(
                target: "quill::registry",
                hook = %definition.id,
                kind = %definition.kind,
                owner = %definition.owner,
                "hook defined"
            );
            self.definitions.insert(
                definition.id.clone(),
                DefinitionEntry {
                    definition,
                    co_owners: Vec::new(),
                },
            );
            return Ok(Registration::Added);
        };

        let existing = &entry.definition;
        if existing.kind != definition.kind {
            return Err(ConflictError::InvocationKind {
                hook: definition.id,
                first_owner: existing.owner.clone(),
                first_kind: existing.kind,
                second_owner: definition.owner,
                second_kind: definition.kind,
            });
        }

        if existing.owner == definition.owner || entry.co_owners.contains(&definition.owner) {
            if !existing.same_declaration(&definition) {
                warn!(
                    target: "quill::registry",
                    hook = %definition.id,
                    owner = %definition.owner,
                    "hook re-declared by its owner with different details; keeping the first"
                );
            }
            return Ok(Registration::Unchanged);
        }

        if !existing.same_declaration(&definition) {
            return Err(ConflictError::Definition {
                hook: definition.id.clone(),
                first_owner: existing.owner.clone(),
                second_owner: definition.owner.clone(),
                detail: describe_difference(existing, &definition),
            });
        }

        entry.co_owners.push(definition.owner);
        Ok(Registration::Shared)
    }

    /// Looks up a definition.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&HookDefinition> {
        self.definitions.get(id).map(|entry| &entry.definition)
    }

    /// Returns true if the id is defined.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Every definition, in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &HookDefinition> {
        self.definitions.values().map(|entry| &entry.definition)
    }

    /// Every turn-phase definition, in registration order.
    pub fn all_turn_phase_definitions(&self) -> impl Iterator<Item = &HookDefinition> {
        self.definitions()
            .filter(|definition| definition.kind == HookKind::TurnPhase)
    }

    /// The declaring owner followed by every co-declarer.
    pub fn owners_of(&self, id: &str) -> impl Iterator<Item = &str> {
        self.definitions.get(id).into_iter().flat_map(|entry| {
            core::iter::once(entry.definition.owner.as_str())
                .chain(entry.co_owners.iter().map(String::as_str))
        })
    }

    /// Adds a binding. Bindings may precede or lack a definition; the
    /// validator reports bindings to undefined hooks.
    pub fn bind(&mut self, binding: EventBinding) {
        debug!(
            target: "quill::registry",
            hook = %binding.hook(),
            owner = binding.owner(),
            tier = %binding.tier(),
            scope = ?binding.scope(),
            "handler bound"
        );
        self.bindings
            .entry(binding.hook().clone())
            .or_default()
            .push(binding);
    }

    /// Bindings for one hook, in registration order.
    #[must_use]
    pub fn bindings_for(&self, hook: &str) -> &[EventBinding] {
        self.bindings.get(hook).map_or(&[], Vec::as_slice)
    }

    /// Every binding.
    pub fn bindings(&self) -> impl Iterator<Item = &EventBinding> {
        self.bindings.values().flatten()
    }

    /// Entity-scoped bindings as `(entity, binding)` pairs.
    pub fn entity_bindings(&self) -> impl Iterator<Item = (&EntityId, &EventBinding)> {
        self.bindings().filter_map(|binding| match binding.scope() {
            BindingScope::Entity(entity) => Some((entity, binding)),
            BindingScope::Module => None,
        })
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if nothing is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Total number of bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }
}

fn describe_difference(a: &HookDefinition, b: &HookDefinition) -> String {
    let mut parts = Vec::new();
    if a.after != b.after {
        parts.push("'after' sets differ");
    }
    if a.before != b.before {
        parts.push("'before' sets differ");
    }
    if a.description != b.description {
        parts.push("descriptions differ");
    }
    parts.join(", ")
}
