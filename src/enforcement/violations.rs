//! Usage violations and handling strategies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Programmer errors detected while a message is being processed.
///
/// These happen inside state callbacks, so they cannot be returned to the
/// caller; the machine reports them and keeps them for inspection.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UsageViolation {
    #[error("transition_to({requested}) called while a transition to {pending} is in progress")]
    TransitionDuringTransition { pending: String, requested: String },

    #[error("transition to unregistered state {target}")]
    UnknownTransitionTarget { target: String },
}

/// Strategy for handling usage violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStrategy {
    /// Log at error level and continue
    #[default]
    Log,

    /// Log, then panic
    Panic,
}
