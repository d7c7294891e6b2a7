/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Tree identity.
//!
//! Every tree in the forest is identified by a [`Color`]: the list of tokens appended, one at a time,
//! each time some node of the tree became a brand new root. A node only ever attaches beneath a color
//! that dominates its own under [`Color::can_connect_to`], and this ordering is the only thing that
//! keeps two trees from attaching beneath each other at the same time.
//!
//! ## Ordering
//!
//! `a.can_connect_to(b)` (i.e., `a` may attach beneath `b`) holds when:
//! 1. `a` is colorless and `b` is not, or
//! 2. `a` and `b` have the same number of tokens and `a` is lexicographically greater than `b`, or
//! 3. `a` and `b` have different numbers of tokens and `a` is the shorter one.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Color(Vec<String>);

impl Color {
    /// The color of a node that has never been the root of a tree.
    pub const fn colorless() -> Self {
        Self(Vec::new())
    }

    /// Create a color from an ordered list of tokens.
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    pub fn is_colorless(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of times the tree has been re-rooted since it was first colored.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Append `token`. Only the owner of the color calls this, when it becomes a new root.
    pub(crate) fn push_token(&mut self, token: String) {
        self.0.push(token)
    }

    /// Whether a node of this color may attach beneath a node of `other`'s color.
    pub fn can_connect_to(&self, other: &Color) -> bool {
        if self.is_colorless() && !other.is_colorless() {
            return true;
        }

        if self.len() == other.len() {
            self.0 > other.0
        } else {
            self.len() < other.len()
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_colorless() {
            f.write_str("<colorless>")
        } else {
            f.write_str(&self.0.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(tokens: &[&str]) -> Color {
        Color::new(tokens.iter().map(|token| token.to_string()).collect())
    }

    #[test]
    fn colorless_attaches_beneath_any_color() {
        let colorless = Color::colorless();
        let colored = color(&["tcp://a"]);
        assert!(colorless.can_connect_to(&colored));
        assert!(!colored.can_connect_to(&colorless));
    }

    #[test]
    fn colorless_never_attaches_beneath_colorless() {
        assert!(!Color::colorless().can_connect_to(&Color::colorless()));
    }

    #[test]
    fn equal_length_greater_attaches_beneath_smaller() {
        let early = color(&["tcp://a"]);
        let late = color(&["tcp://b"]);
        assert!(late.can_connect_to(&early));
        assert!(!early.can_connect_to(&late));
        assert!(!early.can_connect_to(&early.clone()));
    }

    #[test]
    fn shorter_attaches_beneath_longer() {
        let short = color(&["tcp://z"]);
        let long = color(&["tcp://a", "tcp://b"]);
        assert!(short.can_connect_to(&long));
        assert!(!long.can_connect_to(&short));
    }

    #[test]
    fn ordering_is_antisymmetric_for_distinct_colors() {
        let colors = [
            Color::colorless(),
            color(&["a"]),
            color(&["b"]),
            color(&["a", "c"]),
            color(&["b", "a"]),
        ];
        for a in &colors {
            for b in &colors {
                if a != b {
                    assert_ne!(a.can_connect_to(b), b.can_connect_to(a), "{} vs {}", a, b);
                }
            }
        }
    }
}
