//! The message loop a machine is attached to.

use crate::core::Message;
use std::collections::VecDeque;
use std::thread::{self, ThreadId};

/// Host message loop seen from a machine.
///
/// The machine never schedules anything itself. It asks the loop whether
/// the caller is on the owning thread, posts messages to it, and pulls them
/// back out in `run_pending`.
pub trait MessageLoop {
    /// True when called from the thread that owns the loop.
    fn is_current_thread(&self) -> bool;

    /// Queue a message behind everything already pending.
    fn post(&mut self, msg: Message);

    /// Queue a message ahead of everything already pending.
    fn post_at_front(&mut self, msg: Message);

    /// Take the next pending message.
    fn next_message(&mut self) -> Option<Message>;

    /// Number of pending messages.
    fn pending(&self) -> usize;
}

/// In-process loop owned by one thread.
#[derive(Debug)]
pub struct LocalLoop {
    owner: ThreadId,
    queue: VecDeque<Message>,
}

impl LocalLoop {
    /// Loop owned by the calling thread.
    pub fn for_current_thread() -> Self {
        Self::for_thread(thread::current().id())
    }

    pub fn for_thread(owner: ThreadId) -> Self {
        Self {
            owner,
            queue: VecDeque::new(),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }
}

impl Default for LocalLoop {
    fn default() -> Self {
        Self::for_current_thread()
    }
}

impl MessageLoop for LocalLoop {
    fn is_current_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    fn post(&mut self, msg: Message) {
        self.queue.push_back(msg);
    }

    fn post_at_front(&mut self, msg: Message) {
        self.queue.push_front(msg);
    }

    fn next_message(&mut self) -> Option<Message> {
        self.queue.pop_front()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}
