//! State identity and behaviour.
//!
//! A state is split in two: a cheap `StateKey` that identifies it inside the
//! machine, and a boxed `State` behaviour that receives `enter`, `exit` and
//! `process_message` callbacks.

use crate::core::message::Message;
use crate::engine::Context;
use std::fmt::{self, Debug};
use std::hash::Hash;

/// Identity of a state inside a machine.
///
/// Keys are usually a plain enum, see [`state_keys!`](crate::state_keys).
///
/// # Example
///
/// ```rust
/// use hsmind::core::StateKey;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Link {
///     Idle,
///     Connected,
/// }
///
/// impl StateKey for Link {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Connected => "Connected",
///         }
///     }
/// }
///
/// assert_eq!(Link::Connected.name(), "Connected");
/// ```
pub trait StateKey: Copy + Eq + Hash + Debug + 'static {
    /// Name used in logs, log records and dumps.
    fn name(&self) -> &str;
}

/// Whether a state consumed a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The message was consumed, the scan stops here.
    Handled,
    /// The message is offered to the parent state.
    NotHandled,
}

impl Disposition {
    pub fn is_handled(self) -> bool {
        matches!(self, Self::Handled)
    }
}

impl From<bool> for Disposition {
    fn from(handled: bool) -> Self {
        if handled {
            Self::Handled
        } else {
            Self::NotHandled
        }
    }
}

/// Behaviour of a registered state.
///
/// `K` is the key type of the machine and `E` its environment. All three
/// callbacks run on the dispatch thread and receive a [`Context`] through
/// which they may request a transition or defer the current message.
///
/// # Example
///
/// ```rust
/// use hsmind::core::{Disposition, Message, State, StateKey};
/// use hsmind::engine::Context;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Door { Open, Closed }
///
/// impl StateKey for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Open => "Open",
///             Self::Closed => "Closed",
///         }
///     }
/// }
///
/// const CLOSE: i32 = 1;
///
/// struct OpenState;
///
/// impl State<Door> for OpenState {
///     fn process_message(&mut self, msg: &Message, ctx: &mut Context<'_, Door>) -> Disposition {
///         match msg.what {
///             CLOSE => {
///                 ctx.transition_to(Door::Closed);
///                 Disposition::Handled
///             }
///             _ => Disposition::NotHandled,
///         }
///     }
/// }
/// ```
pub trait State<K: StateKey, E = ()> {
    /// Called when the state becomes part of the active stack.
    fn enter(&mut self, _ctx: &mut Context<'_, K, E>) {}

    /// Called when the state leaves the active stack.
    fn exit(&mut self, _ctx: &mut Context<'_, K, E>) {}

    /// Offer a message to this state.
    fn process_message(&mut self, msg: &Message, ctx: &mut Context<'_, K, E>) -> Disposition;
}

/// Anything that may sit on the active stack or be a transition destination.
///
/// The two pseudo-states are sentinels handled by the dispatcher itself:
/// `Halting` reroutes further messages to the halted hook, `Quitting` tears
/// the machine down.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target<K> {
    State(K),
    Halting,
    Quitting,
}

impl<K: StateKey> Target<K> {
    pub fn name(&self) -> &str {
        match self {
            Self::State(key) => key.name(),
            Self::Halting => "HaltingState",
            Self::Quitting => "QuittingState",
        }
    }

    /// The user key, if this is not a pseudo-state.
    pub fn key(&self) -> Option<K> {
        match self {
            Self::State(key) => Some(*key),
            _ => None,
        }
    }

    pub fn is_pseudo(&self) -> bool {
        !matches!(self, Self::State(_))
    }
}

impl<K> From<K> for Target<K> {
    fn from(key: K) -> Self {
        Self::State(key)
    }
}

impl<K: StateKey> Debug for Target<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<K: StateKey> fmt::Display for Target<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum TestKey {
        Initial,
        Processing,
    }

    impl StateKey for TestKey {
        fn name(&self) -> &str {
            match self {
                Self::Initial => "Initial",
                Self::Processing => "Processing",
            }
        }
    }

    #[test]
    fn target_name_uses_key_name() {
        assert_eq!(Target::State(TestKey::Initial).name(), "Initial");
        assert_eq!(Target::<TestKey>::Halting.name(), "HaltingState");
        assert_eq!(Target::<TestKey>::Quitting.name(), "QuittingState");
    }

    #[test]
    fn key_converts_into_target() {
        let target: Target<TestKey> = TestKey::Processing.into();
        assert_eq!(target, Target::State(TestKey::Processing));
        assert_eq!(target.key(), Some(TestKey::Processing));
        assert!(!target.is_pseudo());
    }

    #[test]
    fn pseudo_states_have_no_key() {
        assert_eq!(Target::<TestKey>::Halting.key(), None);
        assert!(Target::<TestKey>::Quitting.is_pseudo());
    }

    #[test]
    fn disposition_from_bool() {
        assert_eq!(Disposition::from(true), Disposition::Handled);
        assert_eq!(Disposition::from(false), Disposition::NotHandled);
        assert!(Disposition::Handled.is_handled());
        assert!(!Disposition::NotHandled.is_handled());
    }

    #[test]
    fn target_debug_is_the_name() {
        assert_eq!(format!("{:?}", Target::State(TestKey::Initial)), "Initial");
        assert_eq!(format!("{}", Target::<TestKey>::Halting), "HaltingState");
    }
}
