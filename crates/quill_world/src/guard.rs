//! Write barrier between an entity's property map and its structured fields.
//!
//! Reads are never affected. Every write path (single insert, insert-if-absent,
//! bulk merge) checks the key against the canonical field set first and fails
//! with [`FieldGuardError`] without touching the map.

use std::sync::{Arc, OnceLock};

use hashbrown::HashSet;

use crate::entity::EntityKind;
use crate::{PropertyMap, Value};

// ─────────────────────────────────────────────────────────────────────────────
// FieldGuardError
// ─────────────────────────────────────────────────────────────────────────────

/// A write through a guarded property map targeted a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldGuardError {
    /// The key names one of the owner's structured attributes.
    #[error(
        "'{field}' is a core field of {owner} and cannot be written through the property map; \
         assign the structured attribute `{field}` directly instead"
    )]
    CoreField {
        /// The rejected key.
        field: String,
        /// Description of the guarded owner, e.g. `item 'lamp'`.
        owner: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// CoreFieldGuard
// ─────────────────────────────────────────────────────────────────────────────

type FieldSet = Arc<HashSet<String>>;

fn kind_fields(kind: EntityKind) -> FieldSet {
    static ACTOR: OnceLock<FieldSet> = OnceLock::new();
    static ITEM: OnceLock<FieldSet> = OnceLock::new();
    static LOCATION: OnceLock<FieldSet> = OnceLock::new();

    let cell = match kind {
        EntityKind::Actor => &ACTOR,
        EntityKind::Item => &ITEM,
        EntityKind::Location => &LOCATION,
    };
    Arc::clone(cell.get_or_init(|| {
        Arc::new(
            kind.canonical_fields()
                .iter()
                .map(|field| (*field).to_owned())
                .collect(),
        )
    }))
}

/// Set of canonical field names plus a label used in error messages.
///
/// Cloning is cheap: the field set is shared.
#[derive(Debug, Clone)]
pub struct CoreFieldGuard {
    label: String,
    fields: FieldSet,
}

impl CoreFieldGuard {
    /// Creates a guard over an arbitrary set of canonical names.
    #[must_use]
    pub fn new<I, S>(label: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            fields: Arc::new(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Creates the guard for an entity kind. The field set is shared by
    /// every guard of the same kind.
    #[must_use]
    pub fn for_kind(kind: EntityKind) -> Self {
        Self {
            label: kind.as_str().to_owned(),
            fields: kind_fields(kind),
        }
    }

    /// Replaces the label used in error messages.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Returns true if `key` is a canonical field name.
    #[must_use]
    pub fn is_canonical(&self, key: &str) -> bool {
        self.fields.contains(key)
    }

    /// Fails if `key` is a canonical field name.
    pub fn check(&self, key: &str) -> Result<(), FieldGuardError> {
        if self.is_canonical(key) {
            return Err(FieldGuardError::CoreField {
                field: key.to_owned(),
                owner: self.label.clone(),
            });
        }
        Ok(())
    }

    /// Returns a protective view over `map`.
    pub fn wrap<'a>(&'a self, map: &'a mut PropertyMap) -> GuardedProperties<'a> {
        GuardedProperties { guard: self, map }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GuardedProperties
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable property-map view that rejects canonical keys.
pub struct GuardedProperties<'a> {
    guard: &'a CoreFieldGuard,
    map: &'a mut PropertyMap,
}

impl GuardedProperties<'_> {
    /// Reads a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    /// Sets a property, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, FieldGuardError> {
        let key = key.into();
        self.guard.check(&key)?;
        Ok(self.map.insert(key, value.into()))
    }

    /// Sets a property only if absent, returning the stored value.
    pub fn insert_if_absent(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Value, FieldGuardError> {
        let key = key.into();
        self.guard.check(&key)?;
        Ok(self.map.entry(key).or_insert_with(|| value.into()))
    }

    /// Merges several properties at once.
    ///
    /// All keys are checked before any is written, so a rejected merge leaves
    /// the map unchanged.
    pub fn merge<I, K>(&mut self, entries: I) -> Result<(), FieldGuardError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        for (key, _) in &entries {
            self.guard.check(key)?;
        }
        self.map.extend(entries);
        Ok(())
    }

    /// Removes a property.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.shift_remove(key)
    }
}
