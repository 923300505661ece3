//! Messages delivered to a state machine.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// `what` of the message that makes a machine quit.
pub const QUIT_CMD: i32 = -1;

/// `what` of the message that enters the initial states.
pub const INIT_CMD: i32 = -2;

/// Opaque payload attached to a message.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A message with an integer identifier and optional arguments.
///
/// User identifiers are expected to be non-negative; negative values are
/// reserved for the machine's own commands.
///
/// # Example
///
/// ```rust
/// use hsmind::core::Message;
///
/// const CONNECT: i32 = 3;
///
/// let msg = Message::with_args(CONNECT, 80, 0).with_obj(String::from("example.org"));
/// assert_eq!(msg.what, CONNECT);
/// assert_eq!(msg.arg1, 80);
/// assert_eq!(msg.payload::<String>().map(String::as_str), Some("example.org"));
/// ```
#[derive(Clone, Default)]
pub struct Message {
    pub what: i32,
    pub arg1: i32,
    pub arg2: i32,
    pub obj: Option<Payload>,
}

impl Message {
    pub fn new(what: i32) -> Self {
        Self {
            what,
            ..Self::default()
        }
    }

    pub fn with_args(what: i32, arg1: i32, arg2: i32) -> Self {
        Self {
            what,
            arg1,
            arg2,
            obj: None,
        }
    }

    /// Attach a payload, replacing any previous one.
    pub fn with_obj<T: Any + Send + Sync>(mut self, obj: T) -> Self {
        self.obj = Some(Arc::new(obj));
        self
    }

    /// Borrow the payload if it has type `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.obj.as_deref().and_then(|obj| obj.downcast_ref::<T>())
    }

    pub(crate) fn quit() -> Self {
        Self::new(QUIT_CMD)
    }

    pub(crate) fn init() -> Self {
        Self::new(INIT_CMD)
    }

    pub fn is_quit(&self) -> bool {
        self.what == QUIT_CMD
    }

    pub fn is_init(&self) -> bool {
        self.what == INIT_CMD
    }

    /// True for the machine's own commands.
    pub fn is_reserved(&self) -> bool {
        self.is_quit() || self.is_init()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("what", &self.what)
            .field("arg1", &self.arg1)
            .field("arg2", &self.arg2)
            .field("obj", &self.obj.as_ref().map(|_| ".."))
            .finish()
    }
}
