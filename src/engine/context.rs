//! What a state callback can see and do.

use crate::core::{Message, StateKey, Target};
use crate::enforcement::{UsageViolation, ViolationStrategy};
use tracing::error;

/// Where a callback runs relative to a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Processing a message, or the final enter of a transition
    Idle,
    /// Any exit, or an enter that is not the last one of the transition
    Transitioning,
}

/// Mutable bookkeeping shared by the dispatcher and the callbacks.
pub(crate) struct Control<K> {
    pub(crate) pending: Option<Target<K>>,
    pub(crate) deferred: Vec<Message>,
    pub(crate) violations: Vec<UsageViolation>,
    pub(crate) strategy: ViolationStrategy,
}

impl<K: StateKey> Control<K> {
    pub(crate) fn new(strategy: ViolationStrategy) -> Self {
        Self {
            pending: None,
            deferred: Vec::new(),
            violations: Vec::new(),
            strategy,
        }
    }

    pub(crate) fn request(&mut self, target: Target<K>, phase: Phase, machine: &str) {
        if phase == Phase::Transitioning {
            let pending = self
                .pending
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| "<none>".to_string());
            self.report(
                UsageViolation::TransitionDuringTransition {
                    pending,
                    requested: target.name().to_string(),
                },
                machine,
            );
        }
        self.pending = Some(target);
    }

    pub(crate) fn report(&mut self, violation: UsageViolation, machine: &str) {
        error!(machine = %machine, %violation, "state machine usage violation");
        self.violations.push(violation.clone());
        if self.strategy == ViolationStrategy::Panic {
            panic!("state machine {machine}: {violation}");
        }
    }
}

/// Handle passed to `enter`, `exit` and `process_message`.
///
/// Through it a state reaches the machine's environment, requests
/// transitions and defers the message it is processing.
pub struct Context<'a, K: StateKey, E = ()> {
    env: &'a mut E,
    control: &'a mut Control<K>,
    machine: &'a str,
    phase: Phase,
}

impl<'a, K: StateKey, E> Context<'a, K, E> {
    pub(crate) fn new(
        env: &'a mut E,
        control: &'a mut Control<K>,
        machine: &'a str,
        phase: Phase,
    ) -> Self {
        Self {
            env,
            control,
            machine,
            phase,
        }
    }

    /// Request a transition, performed once the current message (or the
    /// current transition) completes.
    ///
    /// A later request replaces an earlier one. Requests made from an `exit`
    /// or from an `enter` that is not the transition's last are reported as
    /// usage violations; they still redirect the running transition.
    pub fn transition_to(&mut self, target: impl Into<Target<K>>) {
        self.control.request(target.into(), self.phase, self.machine);
    }

    /// Request a transition to the halting state.
    pub fn transition_to_halting(&mut self) {
        self.transition_to(Target::Halting);
    }

    /// Keep a copy of `msg` and redeliver it, ahead of anything else
    /// pending, once the next transition completes.
    pub fn defer_message(&mut self, msg: &Message) {
        self.control.deferred.push(msg.clone());
    }

    pub fn env(&self) -> &E {
        &*self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut *self.env
    }

    pub fn machine_name(&self) -> &str {
        self.machine
    }

    /// True while exits and intermediate enters of a transition run.
    pub fn is_transitioning(&self) -> bool {
        self.phase == Phase::Transitioning
    }
}
