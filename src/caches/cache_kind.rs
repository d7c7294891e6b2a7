/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The kinds of candidate pools, and the configurable order in which a search consults them.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Children of candidates that refused for reaching their maximum degree.
    Downstream,
    /// Ancestors of candidates that refused for not reaching their minimum degree.
    Upstream,
    /// Candidates that refused for not reaching their minimum degree, retried with the override.
    MinDegree,
    /// The node's own upstream chain and siblings.
    Regional,
    /// Candidates that were busy, retried after a pause.
    Busy,
    /// Candidates from other trees, learnt from gossip and hints.
    Global,
    /// Candidates that refused for reaching their maximum degree, retried with the override.
    MaxDegree,
}

impl CacheKind {
    pub const ALL: [CacheKind; 7] = [
        CacheKind::Downstream,
        CacheKind::Upstream,
        CacheKind::MinDegree,
        CacheKind::Regional,
        CacheKind::Busy,
        CacheKind::Global,
        CacheKind::MaxDegree,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            CacheKind::Downstream => "downstream",
            CacheKind::Upstream => "upstream",
            CacheKind::MinDegree => "min-degree",
            CacheKind::Regional => "regional",
            CacheKind::Busy => "busy",
            CacheKind::Global => "global",
            CacheKind::MaxDegree => "max-degree",
        }
    }
}

impl Display for CacheKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for CacheKind {
    type Err = CacheOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheKind::ALL
            .into_iter()
            .find(|kind| kind.token() == s)
            .ok_or_else(|| CacheOrderError::UnknownCacheKind(s.to_string()))
    }
}

/// Priority order of the candidate pools. Pools that are not listed are never consulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheOrder(Vec<CacheKind>);

impl CacheOrder {
    /// Create an order from a list of distinct kinds.
    pub fn new(kinds: Vec<CacheKind>) -> Result<Self, CacheOrderError> {
        for (index, kind) in kinds.iter().enumerate() {
            if kinds[..index].contains(kind) {
                return Err(CacheOrderError::Duplicate(*kind));
            }
        }
        Ok(Self(kinds))
    }

    pub fn kinds(&self) -> &[CacheKind] {
        &self.0
    }
}

impl Default for CacheOrder {
    fn default() -> Self {
        Self(vec![
            CacheKind::Regional,
            CacheKind::Upstream,
            CacheKind::Downstream,
            CacheKind::MinDegree,
            CacheKind::Busy,
            CacheKind::Global,
            CacheKind::MaxDegree,
        ])
    }
}

impl FromStr for CacheOrder {
    type Err = CacheOrderError;

    /// Parse tokens separated by commas and/or whitespace, e.g. `"regional, busy global"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kinds = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(CacheKind::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        CacheOrder::new(kinds)
    }
}

impl Display for CacheOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.0.iter().map(CacheKind::token).collect();
        f.write_str(&tokens.join(","))
    }
}

/// The ways parsing a [`CacheOrder`] can fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheOrderError {
    UnknownCacheKind(String),
    Duplicate(CacheKind),
}

impl Display for CacheOrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CacheOrderError::UnknownCacheKind(token) => write!(f, "unknown cache kind: {}", token),
            CacheOrderError::Duplicate(kind) => write!(f, "cache kind listed twice: {}", kind),
        }
    }
}

impl std::error::Error for CacheOrderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_separators() {
        let order: CacheOrder = "regional, busy global,max-degree".parse().unwrap();
        assert_eq!(
            order.kinds(),
            &[
                CacheKind::Regional,
                CacheKind::Busy,
                CacheKind::Global,
                CacheKind::MaxDegree
            ]
        );
    }

    #[test]
    fn default_order_round_trips_through_its_display() {
        let order = CacheOrder::default();
        assert_eq!(order.to_string().parse::<CacheOrder>(), Ok(order));
    }

    #[test]
    fn rejects_unknown_and_repeated_tokens() {
        assert_eq!(
            "regional,nearby".parse::<CacheOrder>(),
            Err(CacheOrderError::UnknownCacheKind("nearby".to_string()))
        );
        assert_eq!(
            "busy,global,busy".parse::<CacheOrder>(),
            Err(CacheOrderError::Duplicate(CacheKind::Busy))
        );
    }
}
