//! Entities: actors, items and locations.

use core::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::guard::{CoreFieldGuard, GuardedProperties};
use crate::{PropertyMap, Value};

// ─────────────────────────────────────────────────────────────────────────────
// EntityId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier of an entity within a [`GameState`](crate::GameState).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl core::borrow::Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EntityKind
// ─────────────────────────────────────────────────────────────────────────────

/// The three kinds of entity the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The player or a non-player character.
    Actor,
    /// Something that can be carried, examined or used.
    Item,
    /// A room or other place entities can be in.
    Location,
}

const ACTOR_FIELDS: &[&str] = &[
    "id",
    "kind",
    "name",
    "description",
    "location",
    "behaviors",
    "properties",
    "inventory",
];

const ITEM_FIELDS: &[&str] = &[
    "id",
    "kind",
    "name",
    "description",
    "location",
    "behaviors",
    "properties",
    "portable",
];

const LOCATION_FIELDS: &[&str] = &[
    "id",
    "kind",
    "name",
    "description",
    "location",
    "behaviors",
    "properties",
    "exits",
];

impl EntityKind {
    /// Names of the structured attributes of this kind.
    ///
    /// None of these may ever appear as a key of the entity's property map.
    #[must_use]
    pub fn canonical_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Actor => ACTOR_FIELDS,
            EntityKind::Item => ITEM_FIELDS,
            EntityKind::Location => LOCATION_FIELDS,
        }
    }

    /// Lowercase name used in diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Actor => "actor",
            EntityKind::Item => "item",
            EntityKind::Location => "location",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EntityData
// ─────────────────────────────────────────────────────────────────────────────

/// Kind-specific structured attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityData {
    /// Actor attributes.
    Actor {
        /// Ids of the items the actor carries.
        #[serde(default)]
        inventory: Vec<EntityId>,
    },
    /// Item attributes.
    Item {
        /// Whether the item can be picked up.
        #[serde(default = "default_portable")]
        portable: bool,
    },
    /// Location attributes.
    Location {
        /// Exit direction to destination location.
        #[serde(default)]
        exits: IndexMap<String, EntityId>,
    },
}

fn default_portable() -> bool {
    true
}

impl EntityData {
    /// Returns the kind these attributes belong to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Actor { .. } => EntityKind::Actor,
            EntityData::Item { .. } => EntityKind::Item,
            EntityData::Location { .. } => EntityKind::Location,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity
// ─────────────────────────────────────────────────────────────────────────────

/// An actor, item or location.
///
/// Structured attributes are plain public fields. The free-form property map
/// is private: reads go through [`property`](Self::property) and
/// [`properties`](Self::properties), writes through
/// [`properties_mut`](Self::properties_mut), which applies the entity's
/// [`CoreFieldGuard`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id.
    pub id: EntityId,
    /// Short display name.
    pub name: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// The location (or container actor) this entity is in, if any.
    #[serde(default)]
    pub location: Option<EntityId>,
    /// Names of the behavior modules attached to this entity.
    #[serde(default)]
    pub behaviors: Vec<String>,
    /// Kind-specific attributes.
    #[serde(flatten)]
    pub data: EntityData,
    #[serde(default)]
    properties: PropertyMap,
    /// Built on first write access to the property map.
    #[serde(skip)]
    guard: OnceLock<CoreFieldGuard>,
}

impl Entity {
    /// Creates an entity with the given attributes and an empty property map.
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, data: EntityData) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            location: None,
            behaviors: Vec::new(),
            data,
            properties: PropertyMap::new(),
            guard: OnceLock::new(),
        }
    }

    /// Creates an actor with an empty inventory.
    #[must_use]
    pub fn actor(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self::new(
            id,
            name,
            EntityData::Actor {
                inventory: Vec::new(),
            },
        )
    }

    /// Creates a portable item.
    #[must_use]
    pub fn item(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self::new(id, name, EntityData::Item { portable: true })
    }

    /// Creates a location with no exits.
    #[must_use]
    pub fn location(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self::new(
            id,
            name,
            EntityData::Location {
                exits: IndexMap::new(),
            },
        )
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Places the entity in a location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<EntityId>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attaches a behavior module by name.
    #[must_use]
    pub fn with_behavior(mut self, module: impl Into<String>) -> Self {
        self.behaviors.push(module.into());
        self
    }

    /// Returns the entity's kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    /// Returns true if the named behavior module is attached.
    #[must_use]
    pub fn has_behavior(&self, module: &str) -> bool {
        self.behaviors.iter().any(|b| b == module)
    }

    /// Reads a free-form property. Absent properties read as `None`.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Read-only view of the whole property map.
    #[must_use]
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Guarded write access to the property map.
    ///
    /// The guard is built on first call and memoized on the entity.
    pub fn properties_mut(&mut self) -> GuardedProperties<'_> {
        let guard = self.guard.get_or_init(|| {
            CoreFieldGuard::for_kind(self.data.kind())
                .with_label(format!("{} '{}'", self.data.kind(), self.id))
        });
        guard.wrap(&mut self.properties)
    }

    /// Returns the first property key that shadows a canonical field, if any.
    ///
    /// Property maps built through [`properties_mut`](Self::properties_mut)
    /// never contain one; deserialized content might.
    #[must_use]
    pub fn shadowed_field(&self) -> Option<&str> {
        let canonical = self.kind().canonical_fields();
        self.properties
            .keys()
            .map(String::as_str)
            .find(|key| canonical.contains(key))
    }

    /// Items carried by an actor. Empty for other kinds.
    #[must_use]
    pub fn inventory(&self) -> &[EntityId] {
        match &self.data {
            EntityData::Actor { inventory } => inventory,
            _ => &[],
        }
    }

    /// Exit destination in the given direction, for locations.
    #[must_use]
    pub fn exit(&self, direction: &str) -> Option<&EntityId> {
        match &self.data {
            EntityData::Location { exits } => exits.get(direction),
            _ => None,
        }
    }
}
