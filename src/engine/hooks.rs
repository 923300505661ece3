//! Lifecycle and logging hooks.

use crate::core::Message;

/// Hooks a machine calls on its environment.
///
/// Every method has a no-op default, so an environment only overrides what
/// it cares about. `()` is the environment of machines that need none.
///
/// Hooks receive the environment only; they cannot request transitions.
pub trait MachineHooks {
    /// Before a non-reserved message is offered to the active states.
    fn on_pre_handle_message(&mut self, _msg: &Message) {}

    /// After a non-reserved message and any resulting transitions.
    fn on_post_handle_message(&mut self, _msg: &Message) {}

    /// No state on the active stack handled the message.
    fn unhandled_message(&mut self, _msg: &Message) {}

    /// A message arrived while the machine is halted.
    fn halted_process_message(&mut self, _msg: &Message) {}

    /// The machine transitioned into the halting state.
    fn on_halting(&mut self) {}

    /// The machine transitioned into the quitting state; teardown follows.
    fn on_quitting(&mut self) {}

    /// Teardown is running; release anything tied to the machine.
    fn cleanup_after_quitting(&mut self) {}

    /// Readable name of a message identifier, used by dumps.
    fn what_to_string(&self, _what: i32) -> Option<String> {
        None
    }

    /// Extra text stored in the message's log record.
    fn log_rec_string(&self, _msg: &Message) -> String {
        String::new()
    }

    /// Whether the message should leave a log record.
    fn record_log_rec(&self, _msg: &Message) -> bool {
        true
    }
}

impl MachineHooks for () {}
