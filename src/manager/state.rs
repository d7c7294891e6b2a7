/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Everything a node knows about its place in its tree.

use rand::Rng;

use crate::{
    caches::{GlobalCache, RegionalCache},
    config::Configuration,
    neighbors::Neighbors,
    types::{Color, Depth, NodeDescriptor},
};

/// The mutable state of a topology manager. Always accessed under the manager's state lock.
pub(crate) struct TreeState {
    pub(crate) color: Color,
    pub(crate) depth: Depth,
    /// `None` if and only if the local node is the root of its tree.
    pub(crate) father: Option<NodeDescriptor>,
    /// The depth of the father, as last reported by it.
    pub(crate) father_depth: Option<Depth>,
    pub(crate) neighbors: Neighbors,
    pub(crate) regional: RegionalCache,
    pub(crate) global: GlobalCache,
}

impl TreeState {
    /// The state of a fresh node: a colorless root with a small random depth and empty caches.
    pub(crate) fn new(configuration: &Configuration, rng: &mut impl Rng) -> Self {
        Self {
            color: Color::colorless(),
            depth: Depth::initial(rng),
            father: None,
            father_depth: None,
            neighbors: Neighbors::new(),
            regional: RegionalCache::new(configuration.upstream_max_length, configuration.max_degree),
            global: GlobalCache::new(configuration.global_cache_max_size),
        }
    }

    pub(crate) fn is_root(&self) -> bool {
        self.father.is_none()
    }

    pub(crate) fn is_father(&self, peer: &NodeDescriptor) -> bool {
        self.father.as_ref() == Some(peer)
    }

    /// The neighboring brokers other than the father.
    pub(crate) fn children(&self) -> Vec<NodeDescriptor> {
        self.neighbors.children(self.father.as_ref()).cloned().collect()
    }

    /// The upstream chain a child of the local node should know: the local node's father, then its
    /// further ancestors, at most `max_length` of them.
    pub(crate) fn chain_for_children(&self, max_length: usize) -> Vec<NodeDescriptor> {
        self.father
            .iter()
            .cloned()
            .chain(self.regional.upstream_chain())
            .take(max_length)
            .collect()
    }

    /// The farthest known ancestor, or `local` itself for a root.
    pub(crate) fn local_root(&self, local: &NodeDescriptor) -> NodeDescriptor {
        let upstream = self.regional.upstream_chain();
        upstream
            .last()
            .or(self.father.as_ref())
            .unwrap_or(local)
            .clone()
    }

    /// Move beneath a father of `color` at `father_depth`: adopt its color if it differs, then make
    /// sure the local depth is strictly greater. Returns whether the color changed and whether the
    /// depth changed.
    pub(crate) fn make_cd_greater_than(
        &mut self,
        color: &Color,
        father_depth: Depth,
        rng: &mut impl Rng,
    ) -> (bool, bool) {
        self.father_depth = Some(father_depth);
        if self.color != *color {
            self.color = color.clone();
            self.depth = Depth::beneath(father_depth, rng);
            (true, true)
        } else {
            (false, self.depth.make_greater_than(father_depth, rng))
        }
    }
}
