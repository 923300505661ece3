//! Hsmind: a hierarchical state machine engine
//!
//! States form a forest: each state may have a parent, and a machine is
//! always "in" a leaf state together with all of its ancestors. Messages are
//! offered to the leaf first and bubble up to ancestors until one handles
//! them. Transitions exit only the states that are not shared with the
//! destination and enter the destination's chain root first.
//!
//! # Core Concepts
//!
//! - **StateKey**: Copyable identity of a state, usually declared with [`state_keys!`]
//! - **State**: Behaviour of a state (`enter`, `exit`, `process_message`)
//! - **Machine**: Registry, active stack and the dispatch loop
//! - **Context**: What callbacks may do: request transitions, defer messages
//! - **MachineHooks**: Lifecycle callbacks implemented by the environment
//! - **MachineDump**: Serializable snapshot of recent history for diagnostics
//!
//! # Example
//!
//! ```rust
//! use hsmind::{Context, Disposition, MachineBuilder, Message, State, state_keys};
//!
//! state_keys! {
//!     enum Door { Closed, Open }
//! }
//!
//! const PUSH: i32 = 1;
//!
//! struct Swing(Door);
//!
//! impl State<Door> for Swing {
//!     fn process_message(&mut self, msg: &Message, ctx: &mut Context<'_, Door>) -> Disposition {
//!         if msg.what == PUSH {
//!             ctx.transition_to(self.0);
//!         }
//!         Disposition::from(msg.what == PUSH)
//!     }
//! }
//!
//! let mut machine = MachineBuilder::new("door", ())
//!     .state(Door::Closed, Swing(Door::Open))
//!     .state(Door::Open, Swing(Door::Closed))
//!     .initial(Door::Closed)
//!     .start()
//!     .unwrap();
//!
//! machine.run_message(Message::new(PUSH)).unwrap();
//! assert_eq!(machine.current_state(), Some(Door::Open.into()));
//! ```

pub mod builder;
pub mod core;
pub mod dump;
pub mod enforcement;
pub mod engine;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use crate::core::{Disposition, Message, State, StateKey, Target};
pub use dump::MachineDump;
pub use engine::{Context, HsmError, Machine, MachineConfig, MachineHooks};
