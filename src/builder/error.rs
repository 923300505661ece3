//! Build errors for the machine builder.

use crate::engine::HsmError;
use thiserror::Error;

/// Errors that can occur when building state machines.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("No states defined. Add at least one state")]
    NoStates,

    #[error("State machine rejected the configuration: {0}")]
    Machine(#[from] HsmError),
}
