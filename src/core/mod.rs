//! Core value types of the engine.
//!
//! This module contains what the rest of the crate is built from:
//! - State identity (`StateKey`) and behaviour (`State`)
//! - Transition targets, including the halting and quitting sentinels
//! - Messages and the reserved command identifiers
//! - Bounded log records of processed messages

mod history;
mod message;
mod state;

pub use history::{LogRec, LogRecords, DEFAULT_LOG_REC_SIZE};
pub use message::{Message, Payload, INIT_CMD, QUIT_CMD};
pub use state::{Disposition, State, StateKey, Target};
