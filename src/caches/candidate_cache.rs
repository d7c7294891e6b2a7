/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::{thread, time::Duration};

use rand::Rng;

use crate::types::NodeDescriptor;

use super::queue::CandidateQueue;

/// Degree limits that a [`Request`](crate::messages::Request) asks the candidate to ignore.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct ForceFlags {
    pub(crate) max_degree: bool,
    pub(crate) min_degree: bool,
}

impl ForceFlags {
    pub(crate) const NONE: ForceFlags = ForceFlags {
        max_degree: false,
        min_degree: false,
    };

    pub(crate) const MAX_DEGREE: ForceFlags = ForceFlags {
        max_degree: true,
        min_degree: false,
    };

    pub(crate) const MIN_DEGREE: ForceFlags = ForceFlags {
        max_degree: false,
        min_degree: true,
    };
}

/// A single-pool candidate cache whose retrieval policy is set at construction.
#[derive(Clone, Debug)]
pub(crate) struct CandidateCache {
    queue: CandidateQueue,
    max_size: usize,
    force: ForceFlags,
    retry_delay: Option<Duration>,
}

impl CandidateCache {
    /// Candidates are returned as they are, and asked without any override.
    pub(crate) fn plain(max_size: usize) -> Self {
        Self {
            queue: CandidateQueue::new(),
            max_size,
            force: ForceFlags::NONE,
            retry_delay: None,
        }
    }

    /// Candidates are asked to ignore the degree limits in `force`.
    pub(crate) fn forced(force: ForceFlags, max_size: usize) -> Self {
        Self {
            force,
            ..Self::plain(max_size)
        }
    }

    /// Unbounded. Every retrieval is preceded by a random pause of at most `bound`, so that nodes that
    /// were turned away by the same busy candidate do not come back to it in lockstep.
    pub(crate) fn delayed(bound: Duration) -> Self {
        Self {
            retry_delay: Some(bound),
            ..Self::plain(usize::MAX)
        }
    }

    pub(crate) fn add(&mut self, candidate: NodeDescriptor) -> bool {
        self.queue.add(candidate, self.max_size)
    }

    pub(crate) fn force(&self) -> ForceFlags {
        self.force
    }

    pub(crate) fn size(&self) -> usize {
        self.queue.size()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, candidate: &NodeDescriptor) -> bool {
        self.queue.contains(candidate)
    }

    /// Pop candidates until one satisfies `usable`, discarding the others.
    pub(crate) fn next_matching(
        &mut self,
        rng: &mut impl Rng,
        mut usable: impl FnMut(&NodeDescriptor) -> bool,
    ) -> Option<NodeDescriptor> {
        let candidate = std::iter::from_fn(|| self.queue.next()).find(|candidate| usable(candidate))?;

        if let Some(bound) = self.retry_delay {
            let bound_ms = bound.as_millis() as u64;
            if bound_ms > 0 {
                thread::sleep(Duration::from_millis(rng.gen_range(0u64, bound_ms)));
            }
        }

        Some(candidate)
    }
}
