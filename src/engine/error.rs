//! Errors returned by machine operations.

use crate::enforcement::HierarchyViolation;
use thiserror::Error;

/// Errors that can occur when registering states or submitting messages
#[derive(Debug, Error, PartialEq)]
pub enum HsmError {
    /// A state was registered again under a different parent
    #[error("state {state} already added under parent {existing}, cannot add under {requested}")]
    ParentConflict {
        state: String,
        existing: String,
        requested: String,
    },

    /// The requested parent descends from the state itself
    #[error("state {state} cannot be added under its own descendant {parent}")]
    ParentCycle { state: String, parent: String },

    /// The hierarchy is frozen once the machine has started
    #[error("state machine {machine} has already started")]
    AlreadyStarted { machine: String },

    /// Messages were submitted before start()
    #[error("state machine {machine} not started, received message what={what}")]
    NotStarted { machine: String, what: i32 },

    /// A message was submitted from a thread other than the loop's owner
    #[error("state machine {machine} does not support multiple threads")]
    WrongThread { machine: String },

    /// The hierarchy failed validation at start()
    #[error("invalid state hierarchy: {}", format_violations(.0))]
    InvalidHierarchy(Vec<HierarchyViolation>),
}

fn format_violations(violations: &[HierarchyViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
