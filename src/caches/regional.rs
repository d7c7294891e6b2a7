/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use rand::Rng;

use crate::types::NodeDescriptor;

use super::queue::CandidateQueue;

/// Probability of drawing from the siblings when both pools of a [`RegionalCache`] are non-empty.
const SIBLING_BIAS: f64 = 0.75;

/// The candidates closest to a node in its own tree: its upstream chain (the ancestors above its
/// father, closest first) and its siblings (the other children of its father).
#[derive(Clone, Debug)]
pub(crate) struct RegionalCache {
    upstream: CandidateQueue,
    siblings: CandidateQueue,
    upstream_max: usize,
    siblings_max: usize,
}

impl RegionalCache {
    pub(crate) fn new(upstream_max: usize, siblings_max: usize) -> Self {
        Self {
            upstream: CandidateQueue::new(),
            siblings: CandidateQueue::new(),
            upstream_max,
            siblings_max,
        }
    }

    /// Replace the upstream chain with the first `upstream_max` entries of `chain`.
    pub(crate) fn set_upstream(&mut self, chain: &[NodeDescriptor]) {
        self.upstream.clear();
        // Pushed farthest first so that the closest ancestor is retrieved first.
        for ancestor in chain.iter().take(self.upstream_max).rev() {
            self.upstream.add(ancestor.clone(), self.upstream_max);
        }
    }

    /// The upstream chain, closest ancestor first.
    pub(crate) fn upstream_chain(&self) -> Vec<NodeDescriptor> {
        self.upstream.iter().rev().cloned().collect()
    }

    pub(crate) fn set_siblings(&mut self, siblings: &[NodeDescriptor]) {
        self.siblings.clear();
        for sibling in siblings {
            self.siblings.add(sibling.clone(), self.siblings_max);
        }
    }

    pub(crate) fn add_sibling(&mut self, sibling: NodeDescriptor) -> bool {
        self.siblings.add(sibling, self.siblings_max)
    }

    pub(crate) fn remove_sibling(&mut self, sibling: &NodeDescriptor) -> bool {
        self.siblings.remove(sibling)
    }

    pub(crate) fn siblings(&self) -> Vec<NodeDescriptor> {
        self.siblings.iter().cloned().collect()
    }

    pub(crate) fn contains(&self, candidate: &NodeDescriptor) -> bool {
        self.upstream.contains(candidate) || self.siblings.contains(candidate)
    }

    pub(crate) fn size(&self) -> usize {
        self.upstream.size() + self.siblings.size()
    }

    /// Every candidate in both pools, upstream chain first.
    pub(crate) fn entries(&self) -> Vec<NodeDescriptor> {
        self.upstream_chain()
            .into_iter()
            .chain(self.siblings.iter().cloned())
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.upstream.clear();
        self.siblings.clear();
    }

    /// Take a candidate from one of the pools, favouring the siblings when both have some.
    pub(crate) fn next(&mut self, rng: &mut impl Rng) -> Option<NodeDescriptor> {
        match (self.upstream.is_empty(), self.siblings.is_empty()) {
            (false, false) => {
                if rng.gen::<f64>() < SIBLING_BIAS {
                    self.siblings.next()
                } else {
                    self.upstream.next()
                }
            }
            (false, true) => self.upstream.next(),
            (true, false) => self.siblings.next(),
            (true, true) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(count: usize) -> Vec<NodeDescriptor> {
        (0..count)
            .map(|index| NodeDescriptor::new(vec![format!("mock://{}", index)], true))
            .collect()
    }

    #[test]
    fn upstream_chain_is_truncated_and_keeps_order() {
        let chain = nodes(5);
        let mut regional = RegionalCache::new(3, 4);
        regional.set_upstream(&chain);
        assert_eq!(regional.upstream_chain(), chain[..3].to_vec());
    }

    #[test]
    fn closest_ancestor_is_retrieved_first() {
        let chain = nodes(3);
        let mut regional = RegionalCache::new(3, 4);
        regional.set_upstream(&chain);
        assert_eq!(regional.next(&mut rand::thread_rng()), Some(chain[0].clone()));
    }

    #[test]
    fn drains_both_pools() {
        let all = nodes(6);
        let mut regional = RegionalCache::new(3, 3);
        regional.set_upstream(&all[..3]);
        regional.set_siblings(&all[3..]);
        assert_eq!(regional.size(), 6);

        let mut rng = rand::thread_rng();
        let mut drawn = Vec::new();
        while let Some(candidate) = regional.next(&mut rng) {
            drawn.push(candidate);
        }
        assert_eq!(drawn.len(), 6);
        assert!(all.iter().all(|node| drawn.contains(node)));
    }

    #[test]
    fn siblings_are_favoured() {
        let all = nodes(2);
        let mut rng = rand::thread_rng();
        let mut sibling_draws = 0;
        for _ in 0..1000 {
            let mut regional = RegionalCache::new(1, 1);
            regional.set_upstream(&all[..1]);
            regional.set_siblings(&all[1..]);
            if regional.next(&mut rng) == Some(all[1].clone()) {
                sibling_draws += 1;
            }
        }
        assert!(sibling_draws > 600 && sibling_draws < 900, "{}", sibling_draws);
    }
}
