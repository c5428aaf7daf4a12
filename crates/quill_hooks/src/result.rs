//! Result records returned by handlers and dispatches.

use core::fmt;

use quill_world::GameState;

use crate::hook::HookId;

/// State change a handler wants applied after the caller has accepted its
/// verdict.
pub struct DeferredEffect(Box<dyn FnOnce(&mut GameState) + Send>);

impl DeferredEffect {
    /// Wraps a closure.
    pub fn new(effect: impl FnOnce(&mut GameState) + Send + 'static) -> Self {
        Self(Box::new(effect))
    }

    /// Runs the effect.
    pub fn apply(self, state: &mut GameState) {
        (self.0)(state);
    }

    fn then(self, next: DeferredEffect) -> DeferredEffect {
        DeferredEffect::new(move |state| {
            self.apply(state);
            next.apply(state);
        })
    }
}

impl fmt::Debug for DeferredEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeferredEffect(..)")
    }
}

/// Verdict of one handler, or the composed verdict of a dispatch.
#[derive(Debug)]
#[must_use]
pub struct HookResult {
    /// Whether the action may proceed.
    pub allow: bool,
    /// Text for the narration layer, surfaced verbatim.
    pub message: Option<String>,
    /// Work to run once the caller commits to the action.
    pub deferred_effect: Option<DeferredEffect>,
    /// A handler raised an error or panicked.
    pub faulted: bool,
    /// A handler faulted after it had already mutated game state, so the
    /// command's effect may be partially applied.
    pub inconsistent_state: bool,
}

impl Default for HookResult {
    fn default() -> Self {
        Self::allowed()
    }
}

impl HookResult {
    /// Allow, no message.
    pub fn allowed() -> Self {
        Self {
            allow: true,
            message: None,
            deferred_effect: None,
            faulted: false,
            inconsistent_state: false,
        }
    }

    /// Disallow with an explanation.
    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            allow: false,
            message: Some(message.into()),
            ..Self::allowed()
        }
    }

    /// Sets the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches a deferred effect.
    pub fn with_effect(mut self, effect: impl FnOnce(&mut GameState) + Send + 'static) -> Self {
        self.deferred_effect = Some(DeferredEffect::new(effect));
        self
    }

    pub(crate) fn fault(message: String, inconsistent_state: bool) -> Self {
        Self {
            allow: false,
            message: Some(message),
            deferred_effect: None,
            faulted: true,
            inconsistent_state,
        }
    }

    /// Returns true if the action may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.allow
    }

    /// Runs the deferred effect, if any. Returns whether one ran.
    pub fn apply_deferred(&mut self, state: &mut GameState) -> bool {
        match self.deferred_effect.take() {
            Some(effect) => {
                effect.apply(state);
                true
            }
            None => false,
        }
    }

    /// Combines the results of independently bound handlers.
    ///
    /// `allow` is the AND of every verdict and non-empty messages are joined
    /// with a space in invocation order. Deferred effects of handlers that
    /// disallowed are dropped; the rest are chained in order.
    pub fn compose(results: impl IntoIterator<Item = HookResult>) -> HookResult {
        let mut combined = HookResult::allowed();
        let mut messages: Vec<String> = Vec::new();

        for result in results {
            combined.allow &= result.allow;
            combined.faulted |= result.faulted;
            combined.inconsistent_state |= result.inconsistent_state;

            if let Some(message) = result.message.filter(|m| !m.is_empty()) {
                messages.push(message);
            }
            if result.allow
                && let Some(effect) = result.deferred_effect
            {
                combined.deferred_effect = Some(match combined.deferred_effect.take() {
                    Some(earlier) => earlier.then(effect),
                    None => effect,
                });
            }
        }

        if !messages.is_empty() {
            combined.message = Some(messages.join(" "));
        }
        combined
    }
}

/// Outcome of one turn phase, in scheduler order.
#[derive(Debug)]
pub struct PhaseRecord {
    /// The phase that ran.
    pub hook: HookId,
    /// What its handlers returned.
    pub result: HookResult,
}
