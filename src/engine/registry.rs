//! The forest of registered states.

use crate::core::{State, StateKey, Target};
use crate::engine::HsmError;
use std::collections::HashMap;

/// Registry entry of one state.
pub(crate) struct StateNode<K: StateKey, E> {
    /// `None` for pseudo-states and for parents registered implicitly
    pub(crate) behavior: Option<Box<dyn State<K, E>>>,
    pub(crate) parent: Option<Target<K>>,
    pub(crate) active: bool,
}

impl<K: StateKey, E> StateNode<K, E> {
    fn detached(parent: Option<Target<K>>) -> Self {
        Self {
            behavior: None,
            parent,
            active: false,
        }
    }
}

/// Maps every registered state to its behaviour, parent and activity.
///
/// The halting and quitting sentinels are registered on creation, without a
/// parent, so they can be transition destinations like any other state.
pub struct Registry<K: StateKey, E> {
    nodes: HashMap<Target<K>, StateNode<K, E>>,
}

impl<K: StateKey, E> Default for Registry<K, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: StateKey, E> Registry<K, E> {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(Target::Halting, StateNode::detached(None));
        nodes.insert(Target::Quitting, StateNode::detached(None));
        Self { nodes }
    }

    /// Register `key` under `parent`, registering an unknown parent first.
    ///
    /// Registering the same key again replaces its behaviour. Once a state
    /// has a parent, asking for a different one (or for none) is an error; a
    /// state that was only known as somebody's parent may still be given one.
    pub fn add(
        &mut self,
        key: K,
        behavior: Box<dyn State<K, E>>,
        parent: Option<K>,
    ) -> Result<(), HsmError> {
        let parent = parent.map(Target::State);
        let target = Target::State(key);

        if let Some(existing) = self.nodes.get(&target).and_then(|n| n.parent) {
            if Some(existing) != parent {
                let requested = parent.as_ref().map(Target::name).unwrap_or("<none>");
                return Err(HsmError::ParentConflict {
                    state: key.name().to_string(),
                    existing: existing.name().to_string(),
                    requested: requested.to_string(),
                });
            }
        }

        if let Some(parent) = parent {
            if self.ancestors(parent).any(|t| t == target) {
                return Err(HsmError::ParentCycle {
                    state: key.name().to_string(),
                    parent: parent.name().to_string(),
                });
            }
            self.nodes
                .entry(parent)
                .or_insert_with(|| StateNode::detached(None));
        }

        let node = self
            .nodes
            .entry(target)
            .or_insert_with(|| StateNode::detached(None));
        if parent.is_some() {
            node.parent = parent;
        }
        node.behavior = Some(behavior);
        Ok(())
    }

    /// Remove `key` unless it is unknown, active or a parent.
    pub fn remove(&mut self, key: K) -> bool {
        let target = Target::State(key);
        match self.nodes.get(&target) {
            None => return false,
            Some(node) if node.active => return false,
            Some(_) => {}
        }
        if self.nodes.values().any(|n| n.parent == Some(target)) {
            return false;
        }
        self.nodes.remove(&target).is_some()
    }

    pub fn contains(&self, target: Target<K>) -> bool {
        self.nodes.contains_key(&target)
    }

    pub fn parent_of(&self, target: Target<K>) -> Option<Target<K>> {
        self.nodes.get(&target).and_then(|n| n.parent)
    }

    /// `target` followed by its parent, grandparent and so on.
    pub fn ancestors(&self, target: Target<K>) -> impl Iterator<Item = Target<K>> + '_ {
        std::iter::successors(Some(target), move |&t| self.parent_of(t))
    }

    pub fn is_active(&self, target: Target<K>) -> bool {
        self.nodes.get(&target).is_some_and(|n| n.active)
    }

    pub(crate) fn set_active(&mut self, target: Target<K>, active: bool) {
        if let Some(node) = self.nodes.get_mut(&target) {
            node.active = active;
        }
    }

    pub(crate) fn behavior_mut(&mut self, target: Target<K>) -> Option<&mut Box<dyn State<K, E>>> {
        self.nodes
            .get_mut(&target)
            .and_then(|n| n.behavior.as_mut())
    }

    /// Registered user states, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.nodes.keys().filter_map(Target::key)
    }

    /// User states that were only registered as somebody's parent.
    pub fn detached(&self) -> impl Iterator<Item = K> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.behavior.is_none())
            .filter_map(|(target, _)| target.key())
    }

    /// Number of registered user states.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the longest ancestor chain.
    pub fn max_depth(&self) -> usize {
        self.nodes
            .keys()
            .map(|&target| self.ancestors(target).count())
            .max()
            .unwrap_or(0)
    }

    /// Drop every node, pseudo-states included.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }
}
