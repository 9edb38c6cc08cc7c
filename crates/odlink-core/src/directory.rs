//! Flat identifier directory over the addressable endpoints of a tree

use std::collections::HashMap;

use crate::endpoint::NodeIndex;

/// Maps dotted identifiers to the arena index of every non-object node.
///
/// This is the only structure consulted when resolving an identifier; the
/// hierarchical view is never searched directly.
#[derive(Debug, Clone, Default)]
pub struct EndpointDirectory {
    by_identifier: HashMap<String, NodeIndex>,
    /// Insertion order, so exports are stable across runs
    order: Vec<NodeIndex>,
}

impl EndpointDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier. Returns false if it was already present.
    pub(crate) fn insert(&mut self, identifier: &str, index: NodeIndex) -> bool {
        if self.by_identifier.contains_key(identifier) {
            return false;
        }
        self.by_identifier.insert(identifier.to_string(), index);
        self.order.push(index);
        true
    }

    pub fn lookup(&self, identifier: &str) -> Option<NodeIndex> {
        self.by_identifier.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.by_identifier.contains_key(identifier)
    }

    /// Indices in the order they were registered
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_identifier.clear();
        self.order.clear();
    }
}
