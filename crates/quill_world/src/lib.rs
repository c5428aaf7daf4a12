//! World model for Quill.
//!
//! This crate holds the data every behavior module works against:
//!
//! - [`Entity`] - an actor, item or location with structured attributes and
//!   a free-form property map
//! - [`GameState`] - the shared, single-threaded state handlers mutate in place
//! - [`CoreFieldGuard`] - the write barrier that keeps the property map from
//!   shadowing an entity's structured attributes
//!
//! # Structured attributes vs. properties
//!
//! Every entity kind has a fixed set of canonical fields (`name`, `location`,
//! `inventory`, ...). They live only as struct fields. Anything else a module
//! wants to remember about an entity goes in its property map:
//!
//! ```
//! use quill_world::{Entity, EntityKind};
//! use serde_json::json;
//!
//! let mut lamp = Entity::item("lamp", "brass lamp");
//!
//! // Free-form properties are fine.
//! lamp.properties_mut().insert("lit", json!(false)).unwrap();
//! assert_eq!(lamp.property("lit"), Some(&json!(false)));
//!
//! // Canonical names are rejected loudly.
//! assert!(lamp.properties_mut().insert("location", json!("cellar")).is_err());
//! assert!(EntityKind::Item.canonical_fields().contains(&"location"));
//! ```

mod entity;
mod guard;
mod state;

pub use entity::{Entity, EntityData, EntityId, EntityKind};
pub use guard::{CoreFieldGuard, FieldGuardError, GuardedProperties};
pub use state::GameState;

/// Free-form property values.
pub type Value = serde_json::Value;

/// Insertion-ordered map of free-form property names to values.
pub type PropertyMap = indexmap::IndexMap<String, Value>;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{
        CoreFieldGuard, Entity, EntityData, EntityId, EntityKind, FieldGuardError, GameState,
        GuardedProperties, PropertyMap, Value,
    };
}
