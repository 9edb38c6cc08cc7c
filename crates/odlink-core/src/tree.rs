//! Arena-backed endpoint tree
//!
//! Nodes live in one vector and refer to each other by [`NodeIndex`]. The
//! hierarchical view (roots plus per-node child lists) and the flat
//! [`EndpointDirectory`] are both views into the same arena, so a reload
//! simply replaces the whole tree.

use crate::directory::EndpointDirectory;
use crate::endpoint::{Endpoint, NodeIndex};

#[derive(Debug, Clone, Default)]
pub struct EndpointTree {
    nodes: Vec<Endpoint>,
    roots: Vec<NodeIndex>,
    directory: EndpointDirectory,
}

impl EndpointTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena, registering it in the directory when it is
    /// addressable. Callers must check the identifier is not taken.
    pub(crate) fn insert(&mut self, endpoint: Endpoint) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        if endpoint.kind.is_addressable() {
            self.directory.insert(&endpoint.identifier, index);
        }
        self.nodes.push(endpoint);
        index
    }

    pub(crate) fn add_root(&mut self, index: NodeIndex) {
        self.roots.push(index);
    }

    pub fn get(&self, index: NodeIndex) -> Option<&Endpoint> {
        self.nodes.get(index.0)
    }

    /// Look up an addressable endpoint by its dotted identifier
    pub fn resolve(&self, identifier: &str) -> Option<&Endpoint> {
        self.directory
            .lookup(identifier)
            .and_then(|index| self.get(index))
    }

    pub fn directory(&self) -> &EndpointDirectory {
        &self.directory
    }

    /// Top-level endpoints in schema order
    pub fn roots(&self) -> impl Iterator<Item = &Endpoint> + '_ {
        self.roots.iter().filter_map(|index| self.get(*index))
    }

    /// Addressable endpoints in directory order
    pub fn addressable(&self) -> impl Iterator<Item = &Endpoint> + '_ {
        self.directory.indices().filter_map(|index| self.get(index))
    }

    /// Depth-first walk yielding `(depth, endpoint)`. A function's inputs
    /// are visited before its outputs.
    pub fn walk(&self) -> Vec<(usize, &Endpoint)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, NodeIndex)> =
            self.roots.iter().rev().map(|index| (0, *index)).collect();

        while let Some((depth, index)) = stack.pop() {
            let Some(endpoint) = self.get(index) else {
                continue;
            };
            out.push((depth, endpoint));

            let nested = endpoint
                .children
                .iter()
                .chain(&endpoint.inputs)
                .chain(&endpoint.outputs);
            let mut pending: Vec<NodeIndex> = nested.copied().collect();
            pending.reverse();
            stack.extend(pending.into_iter().map(|child| (depth + 1, child)));
        }

        out
    }

    /// Total number of nodes, objects included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.directory.clear();
    }
}
