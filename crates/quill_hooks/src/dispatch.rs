//! Behavior dispatcher and tiered delegation.
//!
//! A dispatch collects the bindings that apply to `(entity, hook)` and groups
//! them by tier, highest first. Only the top group runs by default. Every
//! binding in a group runs; their verdicts are combined with
//! [`HookResult::compose`]. A handler that wants the more generic behavior
//! beneath it calls [`Invocation::delegate`], which runs the next lower group
//! and hands back its combined result.
//!
//! The remaining groups form a [`DelegationStack`] owned by the dispatch call
//! and dropped when it returns. Every invocation of that call shares one
//! cursor into it, so each lower tier runs at most once per dispatch: once a
//! group has been delegated to, any later request from any handler of the
//! same call gets the "no further handler" denial. Nested dispatches build
//! their own stack and never observe the caller's position.
//!
//! # Faults
//!
//! A handler that returns an error or panics aborts its dispatch: no further
//! handlers of that call run, and a failed result carrying the fault text is
//! returned instead. A fault below a delegation ends the whole dispatch with
//! that fault, whatever the delegating handler returns afterwards. The
//! result is flagged with `inconsistent_state` if any handler on the way had
//! already taken mutable access to the game state.

use core::cell::Cell;
use core::cmp::Reverse;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use quill_world::{Entity, EntityId, GameState, PropertyMap};
use tracing::{debug, error, trace};

use crate::binding::EventBinding;
use crate::hook::{HookKind, Tier};
use crate::registry::HookRegistry;
use crate::result::HookResult;

/// Free-form arguments passed to every handler of a dispatch.
pub type HookContext = PropertyMap;

// ─────────────────────────────────────────────────────────────────────────────
// DelegationStack
// ─────────────────────────────────────────────────────────────────────────────

/// Bindings of one tier that apply to a dispatch.
#[derive(Debug)]
pub struct TierGroup<'r> {
    tier: Tier,
    bindings: Vec<&'r EventBinding>,
}

impl TierGroup<'_> {
    /// The group's tier.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Number of bindings in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Per-call list of tier groups, lowest tier first so the next group to
/// delegate to is always the last one.
#[derive(Debug, Default)]
pub struct DelegationStack<'r> {
    groups: Vec<TierGroup<'r>>,
}

impl<'r> DelegationStack<'r> {
    /// Groups `bindings` by tier. Within a tier, bindings run in owner-name
    /// order, then registration order.
    #[must_use]
    pub fn build(bindings: impl IntoIterator<Item = &'r EventBinding>) -> Self {
        let mut sorted: Vec<&'r EventBinding> = bindings.into_iter().collect();
        // Stable: equal owners keep registration order.
        sorted.sort_by(|a, b| {
            (Reverse(a.tier()), a.owner()).cmp(&(Reverse(b.tier()), b.owner()))
        });

        let mut groups: Vec<TierGroup<'r>> = Vec::new();
        for binding in sorted {
            match groups.last_mut() {
                Some(group) if group.tier == binding.tier() => group.bindings.push(binding),
                _ => groups.push(TierGroup {
                    tier: binding.tier(),
                    bindings: vec![binding],
                }),
            }
        }
        groups.reverse();
        Self { groups }
    }

    /// Number of tier groups.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if there is nothing to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Tiers from highest to lowest.
    pub fn tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        self.groups.iter().rev().map(TierGroup::tier)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation
// ─────────────────────────────────────────────────────────────────────────────

/// What a handler sees while it runs.
pub struct Invocation<'a> {
    dispatcher: &'a BehaviorDispatcher,
    hook: &'a str,
    entity: Option<&'a EntityId>,
    binding: &'a EventBinding,
    state: &'a mut GameState,
    context: &'a HookContext,
    frame: &'a DispatchFrame<'a>,
    mutated: bool,
    pending_fault: Option<HookResult>,
}

impl<'a> Invocation<'a> {
    /// The hook being dispatched.
    #[must_use]
    pub fn hook(&self) -> &str {
        self.hook
    }

    /// Id of the target entity, absent for turn phases.
    #[must_use]
    pub fn entity_id(&self) -> Option<&EntityId> {
        self.entity
    }

    /// The module whose handler is running.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.binding.owner()
    }

    /// The running handler's tier.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.binding.tier()
    }

    /// The dispatch arguments.
    #[must_use]
    pub fn context(&self) -> &HookContext {
        self.context
    }

    /// Read access to the game state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        self.state
    }

    /// Write access to the game state. Marks this invocation as having
    /// mutated state.
    pub fn state_mut(&mut self) -> &mut GameState {
        self.mutated = true;
        self.state
    }

    /// The target entity.
    #[must_use]
    pub fn entity(&self) -> Option<&Entity> {
        self.entity.and_then(|id| self.state.entity(id.as_str()))
    }

    /// The target entity, for mutation. Marks this invocation as having
    /// mutated state.
    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        let id = self.entity?;
        self.mutated = true;
        self.state.entity_mut(id.as_str())
    }

    /// Starts a separate dispatch from inside this handler, for example a
    /// `take` that cascades into an `entity_drop` elsewhere.
    ///
    /// The nested call builds its own delegation stack and leaves this
    /// invocation's untouched. It counts as a mutation, since the nested
    /// handlers have write access to the state.
    pub fn dispatch(&mut self, entity: Option<&EntityId>, hook: &str) -> HookResult {
        self.mutated = true;
        self.dispatcher
            .dispatch(entity, hook, &mut *self.state, self.context)
    }

    /// Returns true if a lower tier is left to delegate to.
    #[must_use]
    pub fn can_delegate(&self) -> bool {
        self.frame.cursor.get() > 0
    }

    /// Runs the next lower tier's handlers and returns their combined
    /// result.
    ///
    /// With no lower tier left, returns a disallowing result explaining
    /// that no further handler exists.
    pub fn delegate(&mut self) -> HookResult {
        let Some(group) = self.frame.pop() else {
            debug!(
                target: "quill::dispatch",
                hook = self.hook,
                owner = self.binding.owner(),
                tier = %self.binding.tier(),
                "delegation requested with no lower tier"
            );
            return HookResult::denied(format!(
                "{} asked for the previous handler of '{}', but no further handler exists below {}",
                self.binding.owner(),
                self.hook,
                self.binding.tier()
            ));
        };
        trace!(
            target: "quill::dispatch",
            hook = self.hook,
            from = %self.binding.tier(),
            to = %group.tier,
            "delegating"
        );
        let outcome = self.dispatcher.run_group(
            group,
            self.frame,
            self.hook,
            self.entity,
            &mut *self.state,
            self.context,
        );
        self.mutated |= outcome.mutated;

        let result = outcome.result;
        if result.faulted && self.pending_fault.is_none() {
            self.pending_fault = Some(HookResult::fault(
                result.message.clone().unwrap_or_default(),
                result.inconsistent_state,
            ));
        }
        result
    }
}

/// Per-call delegation state shared by every invocation of one dispatch.
struct DispatchFrame<'r> {
    groups: &'r [TierGroup<'r>],
    /// Number of groups below the deepest one entered so far.
    cursor: Cell<usize>,
}

impl<'r> DispatchFrame<'r> {
    fn pop(&self) -> Option<&'r TierGroup<'r>> {
        let next = self.cursor.get().checked_sub(1)?;
        self.cursor.set(next);
        self.groups.get(next)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BehaviorDispatcher
// ─────────────────────────────────────────────────────────────────────────────

struct GroupOutcome {
    result: HookResult,
    mutated: bool,
}

/// Resolves and invokes the handlers bound to a hook.
#[derive(Debug, Clone)]
pub struct BehaviorDispatcher {
    registry: Arc<HookRegistry>,
    catch_panics: bool,
}

impl BehaviorDispatcher {
    /// Creates a dispatcher over a frozen registry.
    #[must_use]
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self {
            registry,
            catch_panics: true,
        }
    }

    /// Whether handler panics are caught and turned into failed results.
    /// On by default.
    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    /// The registry this dispatcher reads.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Dispatches `hook` against `entity` (or globally when `None`).
    ///
    /// Zero applicable handlers is not an error: the result is allowed with
    /// no message.
    pub fn dispatch(
        &self,
        entity: Option<&EntityId>,
        hook: &str,
        state: &mut GameState,
        context: &HookContext,
    ) -> HookResult {
        let definition = self.registry.lookup(hook);

        if let (Some(id), Some(definition)) = (entity, definition)
            && definition.kind == HookKind::TurnPhase
        {
            return HookResult::denied(format!(
                "turn phase '{hook}' cannot be dispatched against entity '{id}'"
            ));
        }

        let stack = match entity {
            None => DelegationStack::build(
                self.registry
                    .bindings_for(hook)
                    .iter()
                    .filter(|binding| binding.applies_to(None)),
            ),
            Some(id) => {
                let Some(target) = state.entity(id.as_str()) else {
                    return HookResult::denied(format!(
                        "cannot dispatch '{hook}': entity '{id}' does not exist"
                    ));
                };
                let behaviors = target.behaviors.as_slice();
                DelegationStack::build(
                    self.registry
                        .bindings_for(hook)
                        .iter()
                        .filter(|binding| binding.applies_to(Some((id, behaviors)))),
                )
            }
        };

        let frame = DispatchFrame {
            groups: &stack.groups,
            cursor: Cell::new(stack.groups.len()),
        };
        let Some(top) = frame.pop() else {
            debug!(
                target: "quill::dispatch",
                hook,
                entity = entity.map(EntityId::as_str),
                "no handlers bound"
            );
            return HookResult::allowed();
        };

        debug!(
            target: "quill::dispatch",
            hook,
            entity = entity.map(EntityId::as_str),
            tiers = ?stack.tiers().collect::<Vec<_>>(),
            handlers = top.bindings.len(),
            "dispatching"
        );
        self.run_group(top, &frame, hook, entity, state, context).result
    }

    /// Runs every binding of `group`, stopping at the first fault.
    fn run_group<'a>(
        &'a self,
        group: &'a TierGroup<'a>,
        frame: &'a DispatchFrame<'a>,
        hook: &'a str,
        entity: Option<&'a EntityId>,
        state: &'a mut GameState,
        context: &'a HookContext,
    ) -> GroupOutcome {
        let mut results = Vec::with_capacity(group.bindings.len());
        let mut mutated = false;

        for &binding in &group.bindings {
            let mut invocation = Invocation {
                dispatcher: self,
                hook,
                entity,
                binding,
                state: &mut *state,
                context,
                frame,
                mutated: false,
                pending_fault: None,
            };
            let mut result = self.invoke(binding, &mut invocation);
            mutated |= invocation.mutated;

            if let Some(fault) = invocation.pending_fault.take() {
                if !result.faulted {
                    debug!(
                        target: "quill::dispatch",
                        hook,
                        owner = binding.owner(),
                        tier = %binding.tier(),
                        "delegated handler failed; ending the dispatch with its fault"
                    );
                }
                result = fault;
            }
            if result.faulted {
                result.inconsistent_state |= mutated;
                return GroupOutcome { result, mutated };
            }
            results.push(result);
        }

        GroupOutcome {
            result: HookResult::compose(results),
            mutated,
        }
    }

    fn invoke(&self, binding: &EventBinding, invocation: &mut Invocation<'_>) -> HookResult {
        let outcome = if self.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| binding.call(invocation)))
        } else {
            Ok(binding.call(invocation))
        };

        let reason = match outcome {
            Ok(Ok(result)) => return result,
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        let inconsistent = invocation.mutated;
        error!(
            target: "quill::dispatch",
            hook = invocation.hook,
            entity = invocation.entity.map(EntityId::as_str),
            owner = binding.owner(),
            tier = %binding.tier(),
            inconsistent_state = inconsistent,
            error = %reason,
            "handler failed"
        );
        HookResult::fault(
            format!(
                "{} failed while handling '{}': {reason}",
                binding.owner(),
                invocation.hook
            ),
            inconsistent,
        )
    }
}

fn panic_message(payload: &(dyn core::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_owned()
    }
}
