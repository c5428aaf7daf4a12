//! Shared game state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::guard::FieldGuardError;
use crate::PropertyMap;

/// The single mutable world handlers operate on.
///
/// One player command, including every dispatch it cascades into and the
/// turn-phase batch that follows, is resolved against this object before the
/// next command is read. Handlers mutate it in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    entities: IndexMap<EntityId, Entity>,
    /// Number of completed turns.
    #[serde(default)]
    pub turn: u64,
    /// Module-wide values that belong to no particular entity.
    #[serde(default)]
    pub globals: PropertyMap,
}

impl GameState {
    /// Creates an empty state at turn zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity, returning the one it replaced.
    ///
    /// Fails if the entity's property map shadows one of its canonical fields.
    pub fn spawn(&mut self, entity: Entity) -> Result<Option<Entity>, FieldGuardError> {
        if let Some(field) = entity.shadowed_field() {
            return Err(FieldGuardError::CoreField {
                field: field.to_owned(),
                owner: format!("{} '{}'", entity.kind(), entity.id),
            });
        }
        Ok(self.entities.insert(entity.id.clone(), entity))
    }

    /// Removes an entity.
    pub fn despawn(&mut self, id: &str) -> Option<Entity> {
        self.entities.shift_remove(id)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Looks up an entity for mutation.
    pub fn entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Returns true if the entity exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Iterates over entities in spawn order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities whose `location` is `location`.
    pub fn entities_in<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities
            .values()
            .filter(move |e| e.location.as_ref().is_some_and(|l| l.as_str() == location))
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entities exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Moves an entity. Returns false if it does not exist.
    pub fn relocate(&mut self, id: &str, to: Option<EntityId>) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.location = to;
                true
            }
            None => false,
        }
    }
}
