//! Hook identities, kinds, tiers and definitions.

use core::fmt;
use std::collections::BTreeSet;

// ─────────────────────────────────────────────────────────────────────────────
// HookId
// ─────────────────────────────────────────────────────────────────────────────

/// Globally unique name of an extension point, e.g. `turn_environment` or
/// `entity_take`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(String);

impl HookId {
    /// Creates a hook id.
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

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HookId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for HookId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl core::borrow::Borrow<str> for HookId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookKind
// ─────────────────────────────────────────────────────────────────────────────

/// How a hook is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Fires once per turn, globally, in scheduler order. Handlers get no entity.
    TurnPhase,
    /// Fires against a specific entity in response to a command.
    Entity,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::TurnPhase => f.write_str("turn-phase"),
            HookKind::Entity => f.write_str("entity"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tier
// ─────────────────────────────────────────────────────────────────────────────

/// Priority rank of a module's handlers.
///
/// For the same hook, a higher tier overrides a lower one: game-specific
/// handlers run before library handlers, which run before core handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tier(pub i32);

impl Tier {
    /// Engine-provided behavior.
    pub const CORE: Tier = Tier(0);
    /// Reusable behavior libraries.
    pub const LIBRARY: Tier = Tier(100);
    /// Behavior specific to one game.
    pub const GAME: Tier = Tier(200);
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Tier::CORE => f.write_str("core"),
            Tier::LIBRARY => f.write_str("library"),
            Tier::GAME => f.write_str("game"),
            Tier(rank) => write!(f, "tier {rank}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// Declaration of a hook by a module.
///
/// `after` and `before` only mean something for [`HookKind::TurnPhase`]:
/// `after` lists phases that must run earlier, `before` lists phases that
/// must run later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDefinition {
    /// Unique id.
    pub id: HookId,
    /// Invocation kind.
    pub kind: HookKind,
    /// Phases this one runs after.
    pub after: BTreeSet<HookId>,
    /// Phases this one runs before.
    pub before: BTreeSet<HookId>,
    /// Human-readable purpose.
    pub description: String,
    /// Declaring module. Used only in diagnostics.
    pub owner: String,
}

impl HookDefinition {
    /// Creates a definition with no ordering constraints and no owner.
    #[must_use]
    pub fn new(id: impl Into<HookId>, kind: HookKind) -> Self {
        Self {
            id: id.into(),
            kind,
            after: BTreeSet::new(),
            before: BTreeSet::new(),
            description: String::new(),
            owner: String::new(),
        }
    }

    /// Creates a turn-phase definition.
    #[must_use]
    pub fn turn_phase(id: impl Into<HookId>) -> Self {
        Self::new(id, HookKind::TurnPhase)
    }

    /// Creates an entity definition.
    #[must_use]
    pub fn entity(id: impl Into<HookId>) -> Self {
        Self::new(id, HookKind::Entity)
    }

    /// Adds a phase that must run before this one.
    #[must_use]
    pub fn after(mut self, id: impl Into<HookId>) -> Self {
        self.after.insert(id.into());
        self
    }

    /// Adds a phase that must run after this one.
    #[must_use]
    pub fn before(mut self, id: impl Into<HookId>) -> Self {
        self.before.insert(id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the owning module.
    #[must_use]
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Compares everything except the owner.
    #[must_use]
    pub fn same_declaration(&self, other: &HookDefinition) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.after == other.after
            && self.before == other.before
            && self.description == other.description
    }

    /// Every id named in `after` or `before`.
    pub fn dependencies(&self) -> impl Iterator<Item = &HookId> {
        self.after.iter().chain(self.before.iter())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NamingConvention
// ─────────────────────────────────────────────────────────────────────────────

/// Why a hook id failed the naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingRule {
    /// The id does not start with the prefix for its kind.
    MissingPrefix(String),
    /// Nothing follows the prefix.
    EmptyName,
    /// The id contains something other than `[a-z0-9_]`.
    InvalidCharacter(char),
}

impl fmt::Display for NamingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingRule::MissingPrefix(prefix) => write!(f, "must start with '{prefix}'"),
            NamingRule::EmptyName => f.write_str("needs a name after the prefix"),
            NamingRule::InvalidCharacter(c) => {
                write!(f, "contains '{c}'; use lowercase letters, digits and '_'")
            }
        }
    }
}

/// Prefix rules tying a hook id to its invocation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    /// Prefix of every turn-phase hook id.
    pub turn_phase_prefix: String,
    /// Prefix of every entity hook id.
    pub entity_prefix: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            turn_phase_prefix: "turn_".to_owned(),
            entity_prefix: "entity_".to_owned(),
        }
    }
}

impl NamingConvention {
    /// Returns the prefix required for `kind`.
    #[must_use]
    pub fn prefix_for(&self, kind: HookKind) -> &str {
        match kind {
            HookKind::TurnPhase => &self.turn_phase_prefix,
            HookKind::Entity => &self.entity_prefix,
        }
    }

    /// Checks that `id` is well formed for `kind`.
    pub fn check(&self, id: &str, kind: HookKind) -> Result<(), NamingRule> {
        let prefix = self.prefix_for(kind);
        let Some(rest) = id.strip_prefix(prefix) else {
            return Err(NamingRule::MissingPrefix(prefix.to_owned()));
        };
        if rest.is_empty() {
            return Err(NamingRule::EmptyName);
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
        {
            return Err(NamingRule::InvalidCharacter(c));
        }
        Ok(())
    }
}
