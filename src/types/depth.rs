/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Position of a node within its tree.
//!
//! Depths are real numbers that strictly increase from a root towards the leaves of its tree: for every
//! father-to-child edge inside one color, `depth(father) < depth(child)`. Only the owner of a depth
//! changes it. Values are spread with a little random jitter so that independently chosen depths
//! rarely collide.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use rand::Rng;

/// Distance added between a father and a child that has to move beneath it.
const DEPTH_STEP: f64 = 1.0;

/// Upper bound of the random jitter added on top of [`DEPTH_STEP`].
const JITTER: f64 = 0.1;

/// Number of halvings tried by [`Depth::make_less_than`] before it falls back to the midpoint.
const MAX_SHRINKS: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, BorshSerialize, BorshDeserialize)]
pub struct Depth(f64);

impl Depth {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> f64 {
        self.0
    }

    /// A small random depth, used by fresh nodes and new roots.
    pub(crate) fn initial(rng: &mut impl Rng) -> Self {
        Self(rng.gen_range(0.0, JITTER))
    }

    /// A depth one step (plus jitter) further from the root than `bound`.
    pub(crate) fn beneath(bound: Depth, rng: &mut impl Rng) -> Self {
        Self(bound.0 + DEPTH_STEP + rng.gen_range(0.0, JITTER))
    }

    /// Move this depth strictly above `bound` if it is not already. Returns whether the depth changed.
    pub(crate) fn make_greater_than(&mut self, bound: Depth, rng: &mut impl Rng) -> bool {
        if self.0 > bound.0 {
            return false;
        }
        *self = Self::beneath(bound, rng);
        true
    }

    /// Move this depth strictly below `bound` while staying strictly above `floor` (the depth of the
    /// father, if any).
    ///
    /// Returns `false`, leaving the depth untouched, if there is no room between `floor` and `bound`.
    pub(crate) fn make_less_than(
        &mut self,
        bound: Depth,
        floor: Option<Depth>,
        rng: &mut impl Rng,
    ) -> bool {
        if self.0 < bound.0 && floor.map_or(true, |floor| floor.0 < self.0) {
            return true;
        }

        let floor = match floor {
            None => {
                self.0 = bound.0 - DEPTH_STEP - rng.gen_range(0.0, JITTER);
                return true;
            }
            Some(floor) if floor.0 >= bound.0 => return false,
            Some(floor) => floor,
        };

        let mut gap = DEPTH_STEP;
        for _ in 0..MAX_SHRINKS {
            let candidate = bound.0 - gap * rng.gen_range(0.5, 1.0);
            if floor.0 < candidate && candidate < bound.0 {
                self.0 = candidate;
                return true;
            }
            gap /= 2.0;
        }

        let midpoint = floor.0 + (bound.0 - floor.0) / 2.0;
        if floor.0 < midpoint && midpoint < bound.0 {
            self.0 = midpoint;
            true
        } else {
            false
        }
    }
}

impl Display for Depth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
