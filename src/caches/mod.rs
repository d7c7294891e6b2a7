/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pools of candidate fathers.
//!
//! Every pool is built on the same bounded, de-duplicating, last-in-first-out [`CandidateQueue`].
//! Pools differ only in how candidates are retrieved from them and in how the candidates they return
//! are asked:
//!
//! | Pool | Lifetime | Retrieval |
//! |---|---|---|
//! | [`RegionalCache`] | node | upstream chain and siblings; siblings are preferred, at random |
//! | [`GlobalCache`] | node | a single "good candidate" override first, then the pool |
//! | downstream, upstream | one search | plain |
//! | max-degree, min-degree | one search | plain, but the request overrides the corresponding degree limit |
//! | busy | one search | plain, after a random pause |
//!
//! The node-lifetime pools are cloned at the start of every search (see [`SearchCaches`]), so that a
//! failed search never leaves them half-drained.

pub(crate) mod candidate_cache;

pub mod cache_kind;

pub(crate) mod global;

pub(crate) mod queue;

pub(crate) mod regional;

pub(crate) mod search;

pub use cache_kind::{CacheKind, CacheOrder, CacheOrderError};
pub(crate) use candidate_cache::ForceFlags;
pub(crate) use global::GlobalCache;
pub(crate) use regional::RegionalCache;
pub(crate) use search::SearchCaches;
