/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::collections::VecDeque;

use crate::types::NodeDescriptor;

/// Bounded, de-duplicating stack of candidates.
///
/// [`next`](Self::next) returns the most recently added candidate; when the queue grows past its bound,
/// the oldest candidate is evicted.
#[derive(Clone, Debug, Default)]
pub(crate) struct CandidateQueue {
    entries: VecDeque<NodeDescriptor>,
}

impl CandidateQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add `candidate` unless it is already queued. Returns whether it was added.
    pub(crate) fn add(&mut self, candidate: NodeDescriptor, max_size: usize) -> bool {
        if self.contains(&candidate) {
            return false;
        }

        self.entries.push_back(candidate);
        while self.entries.len() > max_size {
            self.entries.pop_front();
        }
        true
    }

    pub(crate) fn next(&mut self) -> Option<NodeDescriptor> {
        self.entries.pop_back()
    }

    pub(crate) fn size(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn contains(&self, candidate: &NodeDescriptor) -> bool {
        self.entries.contains(candidate)
    }

    pub(crate) fn remove(&mut self, candidate: &NodeDescriptor) -> bool {
        match self.entries.iter().position(|entry| entry == candidate) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear()
    }

    /// Iterate from the oldest to the most recently added candidate.
    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = &NodeDescriptor> {
        self.entries.iter()
    }
}
