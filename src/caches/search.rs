/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The candidate pipeline of a single search for a father.

use std::time::Duration;

use rand::Rng;

use crate::types::NodeDescriptor;

use super::{
    cache_kind::{CacheKind, CacheOrder},
    candidate_cache::{CandidateCache, ForceFlags},
    global::GlobalCache,
    regional::RegionalCache,
};

/// A candidate father, with the pool it came from and the overrides to ask it with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub(crate) node: NodeDescriptor,
    pub(crate) force: ForceFlags,
    pub(crate) source: CacheKind,
}

/// The seven pools consulted by one search, in a fixed priority order.
///
/// The regional and global pools start out as clones of the node's persistent caches; the other five
/// start out empty and are filled by the outcomes of the search's own negotiations.
pub(crate) struct SearchCaches {
    order: CacheOrder,
    regional: RegionalCache,
    global: GlobalCache,
    downstream: CandidateCache,
    upstream: CandidateCache,
    min_degree: CandidateCache,
    max_degree: CandidateCache,
    busy: CandidateCache,
}

impl SearchCaches {
    pub(crate) fn new(
        order: CacheOrder,
        regional: RegionalCache,
        global: GlobalCache,
        max_size: usize,
        busy_retry_delay: Duration,
    ) -> Self {
        Self {
            order,
            regional,
            global,
            downstream: CandidateCache::plain(max_size),
            upstream: CandidateCache::plain(max_size),
            min_degree: CandidateCache::forced(ForceFlags::MIN_DEGREE, max_size),
            max_degree: CandidateCache::forced(ForceFlags::MAX_DEGREE, max_size),
            busy: CandidateCache::delayed(busy_retry_delay),
        }
    }

    /// Take the next candidate for which `usable` holds, from the first pool (in priority order) that
    /// has one. Unusable candidates met on the way are discarded.
    pub(crate) fn next_candidate(
        &mut self,
        rng: &mut impl Rng,
        mut usable: impl FnMut(&NodeDescriptor, CacheKind) -> bool,
    ) -> Option<Candidate> {
        let order = self.order.clone();
        for &source in order.kinds() {
            let found = match source {
                CacheKind::Regional => {
                    std::iter::from_fn(|| self.regional.next(rng)).find(|node| usable(node, source))
                }
                CacheKind::Global => {
                    std::iter::from_fn(|| self.global.next()).find(|node| usable(node, source))
                }
                _ => {
                    let cache = self.single_pool(source);
                    cache.next_matching(rng, |node| usable(node, source))
                }
            };

            if let Some(node) = found {
                let force = match source {
                    CacheKind::Regional | CacheKind::Global => ForceFlags::NONE,
                    _ => self.single_pool(source).force(),
                };
                return Some(Candidate {
                    node,
                    force,
                    source,
                });
            }
        }
        None
    }

    /// The candidate was busy: try it again later.
    pub(crate) fn on_busy(&mut self, candidate: NodeDescriptor) {
        self.busy.add(candidate);
    }

    /// The candidate is full: try its children first, and try it again with the override last.
    pub(crate) fn on_not_max_degree(&mut self, candidate: NodeDescriptor, siblings: Vec<NodeDescriptor>) {
        self.max_degree.add(candidate);
        for sibling in siblings {
            self.downstream.add(sibling);
        }
    }

    /// The candidate wants to stay small: try its ancestors, and try it again with the override.
    pub(crate) fn on_not_min_degree(&mut self, candidate: NodeDescriptor, upstream: Vec<NodeDescriptor>) {
        self.min_degree.add(candidate);
        for ancestor in upstream {
            self.upstream.add(ancestor);
        }
    }

    /// Some node pointed out `candidate` as a node of a tree this node may join.
    pub(crate) fn on_good_candidate(&mut self, candidate: NodeDescriptor) {
        self.global.add(candidate);
    }

    pub(crate) fn size(&self, kind: CacheKind) -> usize {
        match kind {
            CacheKind::Regional => self.regional.size(),
            CacheKind::Global => self.global.size(),
            CacheKind::Downstream => self.downstream.size(),
            CacheKind::Upstream => self.upstream.size(),
            CacheKind::MinDegree => self.min_degree.size(),
            CacheKind::MaxDegree => self.max_degree.size(),
            CacheKind::Busy => self.busy.size(),
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, kind: CacheKind, candidate: &NodeDescriptor) -> bool {
        match kind {
            CacheKind::Regional => self.regional.contains(candidate),
            CacheKind::Global => self.global.contains(candidate),
            CacheKind::Downstream => self.downstream.contains(candidate),
            CacheKind::Upstream => self.upstream.contains(candidate),
            CacheKind::MinDegree => self.min_degree.contains(candidate),
            CacheKind::MaxDegree => self.max_degree.contains(candidate),
            CacheKind::Busy => self.busy.contains(candidate),
        }
    }

    fn single_pool(&mut self, kind: CacheKind) -> &mut CandidateCache {
        match kind {
            CacheKind::Downstream => &mut self.downstream,
            CacheKind::Upstream => &mut self.upstream,
            CacheKind::MinDegree => &mut self.min_degree,
            CacheKind::MaxDegree => &mut self.max_degree,
            CacheKind::Busy => &mut self.busy,
            CacheKind::Regional | CacheKind::Global => {
                unreachable!("the regional and global caches are not single pools")
            }
        }
    }
}
