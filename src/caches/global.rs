/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};

use crate::types::NodeDescriptor;

use super::queue::CandidateQueue;

/// Candidates that may belong to other trees.
///
/// Besides the bounded pool, the cache has a single slot for a "good candidate": a node that some
/// other node pointed out as a likely father. The slot is consumed by the next retrieval.
#[derive(Clone, Debug)]
pub(crate) struct GlobalCache {
    pool: CandidateQueue,
    good_candidate: Option<NodeDescriptor>,
    max_size: usize,
}

impl GlobalCache {
    pub(crate) fn new(max_size: usize) -> Self {
        Self {
            pool: CandidateQueue::new(),
            good_candidate: None,
            max_size,
        }
    }

    pub(crate) fn add(&mut self, candidate: NodeDescriptor) -> bool {
        self.pool.add(candidate, self.max_size)
    }

    /// Add every candidate for which `exclude` is false.
    pub(crate) fn merge<'a>(
        &mut self,
        candidates: impl IntoIterator<Item = &'a NodeDescriptor>,
        mut exclude: impl FnMut(&NodeDescriptor) -> bool,
    ) {
        for candidate in candidates {
            if !exclude(candidate) {
                self.add(candidate.clone());
            }
        }
    }

    pub(crate) fn set_good_candidate(&mut self, candidate: NodeDescriptor) {
        self.good_candidate = Some(candidate)
    }

    /// A copy of the cache for one search. The good candidate moves into the copy, so the next
    /// search does not retry it.
    pub(crate) fn fork(&mut self) -> GlobalCache {
        let fork = self.clone();
        self.good_candidate = None;
        fork
    }

    pub(crate) fn remove(&mut self, candidate: &NodeDescriptor) {
        self.pool.remove(candidate);
        if self.good_candidate.as_ref() == Some(candidate) {
            self.good_candidate = None;
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, candidate: &NodeDescriptor) -> bool {
        self.pool.contains(candidate) || self.good_candidate.as_ref() == Some(candidate)
    }

    pub(crate) fn size(&self) -> usize {
        self.pool.size() + usize::from(self.good_candidate.is_some())
    }

    /// The pool's candidates, oldest first. The good candidate slot is not part of the snapshot.
    pub(crate) fn snapshot(&self) -> Vec<NodeDescriptor> {
        self.pool.iter().cloned().collect()
    }

    pub(crate) fn next(&mut self) -> Option<NodeDescriptor> {
        self.good_candidate.take().or_else(|| self.pool.next())
    }

    /// Draw `fraction` of the pool's candidates that are not in `ignore`, without repetition.
    pub(crate) fn sample(
        &self,
        fraction: f64,
        ignore: &HashSet<NodeDescriptor>,
        rng: &mut impl Rng,
    ) -> Vec<NodeDescriptor> {
        let eligible: Vec<&NodeDescriptor> = self
            .pool
            .iter()
            .filter(|candidate| !ignore.contains(*candidate))
            .collect();
        let amount = ((eligible.len() as f64) * fraction.clamp(0.0, 1.0)).round() as usize;

        eligible
            .choose_multiple(rng, amount)
            .map(|candidate| (*candidate).clone())
            .collect()
    }
}
