//! The active stack and the scratch stack used to compute transitions.

use crate::core::{StateKey, Target};
use crate::engine::Registry;

/// Chain of entered states, root-most first.
pub(crate) struct StateStack<K> {
    active: Vec<Target<K>>,
    /// States to enter, leaf first; filled by `setup_entering`
    scratch: Vec<Target<K>>,
}

impl<K: StateKey> StateStack<K> {
    pub(crate) fn new() -> Self {
        Self {
            active: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub(crate) fn reserve(&mut self, depth: usize) {
        self.active.reserve(depth.saturating_sub(self.active.len()));
        self.scratch.reserve(depth.saturating_sub(self.scratch.len()));
    }

    pub(crate) fn top(&self) -> Option<Target<K>> {
        self.active.last().copied()
    }

    pub(crate) fn get(&self, index: usize) -> Option<Target<K>> {
        self.active.get(index).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn as_slice(&self) -> &[Target<K>] {
        &self.active
    }

    pub(crate) fn pop(&mut self) -> Option<Target<K>> {
        self.active.pop()
    }

    /// Fill the scratch stack with the whole ancestor chain of `initial`
    /// and make it the active stack.
    pub(crate) fn setup_initial<E>(&mut self, initial: Target<K>, registry: &Registry<K, E>) {
        self.scratch.clear();
        self.scratch.extend(registry.ancestors(initial));
        self.active.clear();
        self.push_entering();
    }

    /// Collect `dest` and its inactive ancestors into the scratch stack,
    /// leaf first, returning the first active ancestor.
    ///
    /// `dest` itself is always collected, active or not, so a transition to
    /// an entered state exits and re-enters it.
    pub(crate) fn setup_entering<E>(
        &mut self,
        dest: Target<K>,
        registry: &Registry<K, E>,
    ) -> Option<Target<K>> {
        self.scratch.clear();
        let mut cur = dest;
        loop {
            self.scratch.push(cur);
            match registry.parent_of(cur) {
                Some(parent) if registry.is_active(parent) => return Some(parent),
                Some(parent) => cur = parent,
                None => return None,
            }
        }
    }

    /// Move the scratch stack onto the active stack, reversing it, and
    /// return the index where entering starts.
    pub(crate) fn push_entering(&mut self) -> usize {
        let start = self.active.len();
        self.active.extend(self.scratch.drain(..).rev());
        start
    }

    pub(crate) fn clear(&mut self) {
        self.active = Vec::new();
        self.scratch = Vec::new();
    }
}
