//! Construction rules for a state hierarchy, checked with Validation.

use crate::core::StateKey;
use crate::engine::Registry;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Problems that keep a hierarchy from being started
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HierarchyViolation {
    #[error("initial state not set. Call set_initial_state() before start()")]
    MissingInitialState,

    #[error("initial state {state} is not registered")]
    UnregisteredInitialState { state: String },

    #[error("state {state} was only registered as a parent and has no behaviour")]
    DetachedState { state: String },
}

/// Check every construction rule, accumulating ALL violations.
/// Returns Validation::Success(()) if the hierarchy can be started.
pub fn check_hierarchy<K: StateKey, E>(
    registry: &Registry<K, E>,
    initial: Option<K>,
) -> Validation<(), NonEmptyVec<HierarchyViolation>> {
    let mut checks: Vec<Validation<(), NonEmptyVec<HierarchyViolation>>> = Vec::new();

    let initial_check = match initial {
        None => Validation::fail(HierarchyViolation::MissingInitialState),
        Some(key) if !registry.contains(key.into()) => {
            Validation::fail(HierarchyViolation::UnregisteredInitialState {
                state: key.name().to_string(),
            })
        }
        Some(_) => Validation::success(()),
    };
    checks.push(initial_check);

    let mut detached: Vec<K> = registry.detached().collect();
    detached.sort_by(|a, b| a.name().cmp(b.name()));
    for key in detached {
        checks.push(Validation::fail(HierarchyViolation::DetachedState {
            state: key.name().to_string(),
        }));
    }

    Validation::all_vec(checks).map(|_| ())
}

/// Flatten the result of [`check_hierarchy`] into a plain list.
pub fn violations_of(
    result: Validation<(), NonEmptyVec<HierarchyViolation>>,
) -> Vec<HierarchyViolation> {
    match result {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(errors) => errors.iter().cloned().collect(),
    }
}
