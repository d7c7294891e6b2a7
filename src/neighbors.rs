/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The confirmed neighbors of the local node.
//!
//! Brokers are the tree edges (the father and the children); clients are leaf subscribers that never
//! take part in the tree protocol and never count toward the broker degree.

use std::collections::HashSet;

use crate::types::NodeDescriptor;

#[derive(Clone, Debug, Default)]
pub(crate) struct Neighbors {
    brokers: HashSet<NodeDescriptor>,
    clients: HashSet<NodeDescriptor>,
}

impl Neighbors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `peer` as a neighbor, sorted by its broker flag. Returns whether it was new.
    pub(crate) fn confirm(&mut self, peer: NodeDescriptor) -> bool {
        if peer.is_broker() {
            self.brokers.insert(peer)
        } else {
            self.clients.insert(peer)
        }
    }

    pub(crate) fn remove(&mut self, peer: &NodeDescriptor) -> bool {
        self.brokers.remove(peer) || self.clients.remove(peer)
    }

    pub(crate) fn contains(&self, peer: &NodeDescriptor) -> bool {
        self.brokers.contains(peer) || self.clients.contains(peer)
    }

    pub(crate) fn is_broker(&self, peer: &NodeDescriptor) -> bool {
        self.brokers.contains(peer)
    }

    /// The neighboring brokers other than `father`.
    pub(crate) fn children<'a>(
        &'a self,
        father: Option<&'a NodeDescriptor>,
    ) -> impl Iterator<Item = &'a NodeDescriptor> {
        self.brokers
            .iter()
            .filter(move |broker| Some(*broker) != father)
    }

    pub(crate) fn number_of_brokers(&self) -> usize {
        self.brokers.len()
    }

    pub(crate) fn number_of_clients(&self) -> usize {
        self.clients.len()
    }

    pub(crate) fn all(&self) -> HashSet<NodeDescriptor> {
        self.brokers.union(&self.clients).cloned().collect()
    }
}
