//! Load-time validation.
//!
//! Five categories run in a fixed order and validation stops at the first
//! category that reports anything:
//!
//! 1. Naming: ids follow the convention for their kind.
//! 2. Dependency: `after`/`before` entries name defined turn phases, and
//!    every binding names a defined hook.
//! 3. Conflict: no two owners declared the same id incompatibly.
//! 4. Placement: no turn phase is bound to an individual entity.
//! 5. Cycle: the turn phases can be ordered.
//!
//! Within a category every violation is collected, so an author sees the
//! whole list at once.

use hashbrown::HashSet;
use tracing::{debug, error};

use crate::binding::BindingScope;
use crate::error::{
    ConflictError, CycleError, DependencyError, LoadError, NamingError, PlacementError,
};
use crate::hook::{HookDefinition, HookId, HookKind, NamingConvention};
use crate::registry::HookRegistry;
use crate::schedule::TurnPhaseScheduler;

/// Runs the load-time checks over a populated registry.
#[derive(Debug)]
pub struct Validator<'a> {
    registry: &'a HookRegistry,
    naming: &'a NamingConvention,
    conflicts: &'a [ConflictError],
}

impl<'a> Validator<'a> {
    /// Creates a validator for `registry` using `naming`.
    #[must_use]
    pub fn new(registry: &'a HookRegistry, naming: &'a NamingConvention) -> Self {
        Self {
            registry,
            naming,
            conflicts: &[],
        }
    }

    /// Conflicts rejected while the registry was being populated. They are
    /// reported in the conflict category.
    #[must_use]
    pub fn with_conflicts(mut self, conflicts: &'a [ConflictError]) -> Self {
        self.conflicts = conflicts;
        self
    }

    /// Runs every category in order.
    ///
    /// On success returns the scheduler built by the cycle check, so the
    /// order does not have to be computed twice.
    pub fn run(&self) -> Result<TurnPhaseScheduler, LoadError> {
        let outcome = self.run_categories();
        match &outcome {
            Ok(scheduler) => debug!(
                target: "quill::validate",
                hooks = self.registry.len(),
                bindings = self.registry.binding_count(),
                phases = scheduler.len(),
                "registry validated"
            ),
            Err(err) => error!(
                target: "quill::validate",
                category = err.category(),
                "{err}"
            ),
        }
        outcome
    }

    fn run_categories(&self) -> Result<TurnPhaseScheduler, LoadError> {
        let naming = self.check_naming();
        if !naming.is_empty() {
            return Err(LoadError::Naming(naming));
        }

        let dependencies = self.check_dependencies();
        if !dependencies.is_empty() {
            return Err(LoadError::Dependency(dependencies));
        }

        let conflicts = self.check_conflicts();
        if !conflicts.is_empty() {
            return Err(LoadError::Conflict(conflicts));
        }

        let placement = self.check_placement();
        if !placement.is_empty() {
            return Err(LoadError::Placement(placement));
        }

        Ok(self.check_cycles()?)
    }

    /// Ids that break the naming convention for their kind.
    #[must_use]
    pub fn check_naming(&self) -> Vec<NamingError> {
        self.registry
            .definitions()
            .filter_map(|definition| {
                self.naming
                    .check(definition.id.as_str(), definition.kind)
                    .err()
                    .map(|rule| NamingError {
                        hook: definition.id.clone(),
                        kind: definition.kind,
                        owner: definition.owner.clone(),
                        rule,
                    })
            })
            .collect()
    }

    /// Ordering constraints that name missing or entity hooks, and bindings
    /// to hooks nobody defines.
    #[must_use]
    pub fn check_dependencies(&self) -> Vec<DependencyError> {
        let mut errors = Vec::new();

        for definition in self.registry.all_turn_phase_definitions() {
            self.check_relation(definition, &definition.after, "after", &mut errors);
            self.check_relation(definition, &definition.before, "before", &mut errors);
        }

        let mut reported: HashSet<(&HookId, &str)> = HashSet::new();
        for binding in self.registry.bindings() {
            if !self.registry.contains(binding.hook().as_str())
                && reported.insert((binding.hook(), binding.owner()))
            {
                errors.push(DependencyError::UnboundHook {
                    hook: binding.hook().clone(),
                    owner: binding.owner().to_owned(),
                });
            }
        }

        errors
    }

    fn check_relation<'d>(
        &self,
        definition: &HookDefinition,
        targets: impl IntoIterator<Item = &'d HookId>,
        relation: &'static str,
        errors: &mut Vec<DependencyError>,
    ) {
        for target in targets {
            match self.registry.lookup(target.as_str()) {
                None => errors.push(DependencyError::Missing {
                    hook: definition.id.clone(),
                    owner: definition.owner.clone(),
                    dependency: target.clone(),
                    relation,
                }),
                Some(found) if found.kind != HookKind::TurnPhase => {
                    errors.push(DependencyError::NotTurnPhase {
                        hook: definition.id.clone(),
                        owner: definition.owner.clone(),
                        dependency: target.clone(),
                        dependency_owner: found.owner.clone(),
                        relation,
                    });
                }
                Some(_) => {}
            }
        }
    }

    /// Conflicting declarations recorded while loading.
    #[must_use]
    pub fn check_conflicts(&self) -> Vec<ConflictError> {
        self.conflicts.to_vec()
    }

    /// Turn-phase hooks bound to individual entities.
    #[must_use]
    pub fn check_placement(&self) -> Vec<PlacementError> {
        self.registry
            .bindings()
            .filter_map(|binding| {
                let BindingScope::Entity(entity) = binding.scope() else {
                    return None;
                };
                let definition = self.registry.lookup(binding.hook().as_str())?;
                (definition.kind == HookKind::TurnPhase).then(|| PlacementError {
                    entity: entity.clone(),
                    hook: binding.hook().clone(),
                    owner: binding.owner().to_owned(),
                })
            })
            .collect()
    }

    /// Dry-runs the turn-phase sort.
    pub fn check_cycles(&self) -> Result<TurnPhaseScheduler, CycleError> {
        TurnPhaseScheduler::initialize(self.registry.all_turn_phase_definitions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::EventBinding;
    use crate::hook::Tier;
    use crate::result::HookResult;

    fn registry(defs: impl IntoIterator<Item = HookDefinition>) -> HookRegistry {
        let mut registry = HookRegistry::new();
        for def in defs {
            registry.register(def).unwrap();
        }
        registry
    }

    #[test]
    fn clean_registry_passes() {
        let registry = registry([
            HookDefinition::turn_phase("turn_a").owned_by("m"),
            HookDefinition::turn_phase("turn_b").after("turn_a").owned_by("m"),
            HookDefinition::entity("entity_take").owned_by("m"),
        ]);
        let naming = NamingConvention::default();
        let scheduler = Validator::new(&registry, &naming).run().unwrap();
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn naming_reports_every_offender() {
        let registry = registry([
            HookDefinition::turn_phase("environment").owned_by("weather"),
            HookDefinition::entity("turn_take").owned_by("doors"),
            HookDefinition::entity("entity_Take").owned_by("doors"),
        ]);
        let naming = NamingConvention::default();
        let errors = Validator::new(&registry, &naming).check_naming();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].owner, "weather");
    }

    #[test]
    fn dependency_on_entity_hook_is_reported() {
        let registry = registry([
            HookDefinition::entity("entity_take").owned_by("doors"),
            HookDefinition::turn_phase("turn_a")
                .before("entity_take")
                .owned_by("weather"),
        ]);
        let naming = NamingConvention::default();
        let errors = Validator::new(&registry, &naming).check_dependencies();
        assert!(matches!(
            &errors[..],
            [DependencyError::NotTurnPhase { relation: "before", .. }]
        ));
    }

    #[test]
    fn binding_to_undefined_hook_is_reported_once_per_owner() {
        let mut registry = HookRegistry::new();
        for _ in 0..2 {
            registry.bind(EventBinding::new("entity_push", "doors", Tier::LIBRARY, |_| {
                Ok(HookResult::allowed())
            }));
        }
        let naming = NamingConvention::default();
        let errors = Validator::new(&registry, &naming).check_dependencies();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("doors"));
    }

    #[test]
    fn placement_flags_entity_bound_turn_phase() {
        let mut registry = registry([HookDefinition::turn_phase("turn_a").owned_by("m")]);
        registry.bind(
            EventBinding::new("turn_a", "story", Tier::GAME, |_| Ok(HookResult::allowed()))
                .for_entity("idol"),
        );
        let naming = NamingConvention::default();
        let errors = Validator::new(&registry, &naming).check_placement();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entity.as_str(), "idol");
    }
}
