//! The dispatch engine.
//!
//! This module drives registered states:
//! - **Registry**: the forest of states with their parents and activity
//! - **Machine**: serialized message dispatch and the transition engine
//! - **Context**: what state callbacks may do while they run
//! - **Hooks**: lifecycle callbacks implemented by the environment
//! - **MessageLoop**: the host loop a machine is attached to
//!
//! A machine never locks anything. It relies on the host loop delivering
//! one message at a time, and each message, including the transitions it
//! causes, is processed to completion before the next one is accepted.

mod config;
mod context;
mod error;
mod hooks;
mod looper;
mod machine;
mod registry;
mod stack;

pub use config::MachineConfig;
pub use context::Context;
pub use error::HsmError;
pub use hooks::MachineHooks;
pub use looper::{LocalLoop, MessageLoop};
pub use machine::Machine;
pub use registry::Registry;
