//! Turn-phase scheduler.
//!
//! The order of every turn phase is computed once, when a game loads, and
//! replayed unchanged every turn. Each `after` entry `D.after ∋ A` becomes the
//! edge `A → D`; each `before` entry `D.before ∋ B` becomes `D → B`. The sort
//! is Kahn's algorithm run in rounds: every phase that is available in a
//! round is emitted in lexical id order, then its successors are released.
//! The result depends only on the constraint set, never on declaration order.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use quill_world::GameState;
use tracing::{debug, debug_span, trace};

use crate::dispatch::{BehaviorDispatcher, HookContext};
use crate::error::CycleError;
use crate::hook::{HookDefinition, HookId, HookKind};
use crate::result::PhaseRecord;

/// Cached, dependency-ordered list of turn phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPhaseScheduler {
    order: Vec<HookId>,
}

impl TurnPhaseScheduler {
    /// Sorts the turn-phase definitions among `definitions`.
    ///
    /// Entity hooks are ignored, as are constraints naming ids that are not
    /// turn phases (the validator reports those). Fails with a concrete cycle
    /// if the constraints cannot be satisfied; a partial order is never
    /// returned.
    pub fn initialize<'a>(
        definitions: impl IntoIterator<Item = &'a HookDefinition>,
    ) -> Result<Self, CycleError> {
        let phases: BTreeMap<&HookId, &HookDefinition> = definitions
            .into_iter()
            .filter(|definition| definition.kind == HookKind::TurnPhase)
            .map(|definition| (&definition.id, definition))
            .collect();

        // Indices follow lexical id order, so comparing indices compares ids.
        let ids: Vec<&HookId> = phases.keys().copied().collect();
        let index: HashMap<&HookId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let n = ids.len();
        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut predecessors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];

        for (d, definition) in phases.values().enumerate() {
            for earlier in &definition.after {
                match index.get(earlier) {
                    Some(&a) => {
                        successors[a].insert(d);
                        predecessors[d].insert(a);
                    }
                    None => trace!(
                        target: "quill::schedule",
                        hook = %definition.id,
                        after = %earlier,
                        "ignoring constraint on a non-turn-phase id"
                    ),
                }
            }
            for later in &definition.before {
                match index.get(later) {
                    Some(&b) => {
                        successors[d].insert(b);
                        predecessors[b].insert(d);
                    }
                    None => trace!(
                        target: "quill::schedule",
                        hook = %definition.id,
                        before = %later,
                        "ignoring constraint on a non-turn-phase id"
                    ),
                }
            }
        }

        let mut in_degree: Vec<usize> = predecessors.iter().map(BTreeSet::len).collect();
        let mut emitted = vec![false; n];
        let mut sorted: Vec<usize> = Vec::with_capacity(n);

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        while !ready.is_empty() {
            let mut next = BTreeSet::new();
            for &node in &ready {
                emitted[node] = true;
                sorted.push(node);
                for &succ in &successors[node] {
                    in_degree[succ] -= 1;
                    if in_degree[succ] == 0 {
                        next.insert(succ);
                    }
                }
            }
            ready = next;
        }

        if sorted.len() != n {
            let cycle = find_cycle(&predecessors, &emitted);
            let mut owners: Vec<String> = Vec::new();
            for &node in &cycle {
                let owner = &phases[ids[node]].owner;
                if !owners.contains(owner) {
                    owners.push(owner.clone());
                }
            }
            let mut path: Vec<HookId> = cycle.iter().map(|&i| ids[i].clone()).collect();
            if let Some(first) = path.first().cloned() {
                path.push(first);
            }
            let unresolved = (0..n)
                .filter(|&i| !emitted[i])
                .map(|i| ids[i].clone())
                .collect();

            return Err(CycleError {
                path,
                owners,
                unresolved,
            });
        }

        let order: Vec<HookId> = sorted.into_iter().map(|i| ids[i].clone()).collect();
        debug!(
            target: "quill::schedule",
            phases = order.len(),
            order = ?order.iter().map(HookId::as_str).collect::<Vec<_>>(),
            "turn phase order computed"
        );
        Ok(Self { order })
    }

    /// The cached order.
    #[must_use]
    pub fn order(&self) -> &[HookId] {
        &self.order
    }

    /// Number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if there are no phases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Runs every phase once, in order, collecting one record per phase.
    ///
    /// A phase without handlers yields an allowed record with no message. A
    /// fault in one phase does not stop the phases after it.
    pub fn execute(
        &self,
        dispatcher: &BehaviorDispatcher,
        state: &mut GameState,
        context: &HookContext,
    ) -> Vec<PhaseRecord> {
        let _span = debug_span!(target: "quill::schedule", "turn", turn = state.turn).entered();

        self.order
            .iter()
            .map(|hook| {
                let result = dispatcher.dispatch(None, hook.as_str(), state, context);
                PhaseRecord {
                    hook: hook.clone(),
                    result,
                }
            })
            .collect()
    }
}

/// Reconstructs one cycle among the nodes that were never emitted.
///
/// Every such node still has an unemitted predecessor, so walking
/// predecessors (smallest first) from the smallest unemitted node must
/// revisit a node. The revisited stretch, reversed, is a forward cycle; it is
/// rotated to start at its smallest node.
fn find_cycle(predecessors: &[BTreeSet<usize>], emitted: &[bool]) -> Vec<usize> {
    let Some(start) = (0..emitted.len()).find(|&i| !emitted[i]) else {
        return Vec::new();
    };

    let mut walk: Vec<usize> = Vec::new();
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut current = start;

    let mut cycle = loop {
        if let Some(&pos) = position.get(&current) {
            break walk[pos..].to_vec();
        }
        position.insert(current, walk.len());
        walk.push(current);

        match predecessors[current].iter().find(|&&p| !emitted[p]) {
            Some(&p) => current = p,
            None => return walk,
        }
    };

    cycle.reverse();
    if let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by_key(|&(_, node)| *node)
        .map(|(pos, _)| pos)
    {
        cycle.rotate_left(min_pos);
    }
    cycle
}
