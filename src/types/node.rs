/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Peer identities.
//!
//! A [`NodeDescriptor`] is the only thing the tree protocol knows about a peer: how to reach it (its
//! URLs) and whether it is a broker taking part in the overlay or a client hanging off one. Two
//! descriptors are the same peer if and only if their [`NodeId`]s are equal; URLs are only routing
//! hints and may be shared by successive incarnations of a process.

use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Opaque 32-byte identifier of a peer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct NodeId([u8; 32]);

impl NodeId {
    /// Create a `NodeId` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the bytes of this `NodeId`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let encoded = STANDARD_NO_PAD.encode(self.0);
        f.write_str(&encoded[0..7])
    }
}

/// Identity of a peer, plus the information needed to open a link to it.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub struct NodeDescriptor {
    id: NodeId,
    urls: Vec<String>,
    broker: bool,
}

impl NodeDescriptor {
    /// Create a descriptor for a fresh incarnation of a peer reachable at `urls`.
    ///
    /// The id is the SHA-256 digest of the URLs followed by a random nonce, so restarting a process
    /// at the same URLs yields a different peer.
    pub fn new(urls: Vec<String>, broker: bool) -> Self {
        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);

        let mut hasher = Sha256::new();
        for url in &urls {
            hasher.update(url.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(nonce);

        Self {
            id: NodeId(hasher.finalize().into()),
            urls,
            broker,
        }
    }

    /// Create a descriptor with a known id, e.g., one received from a peer.
    pub fn with_id(id: NodeId, urls: Vec<String>, broker: bool) -> Self {
        Self { id, urls, broker }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// The URL used when the tree protocol has to open a link to this peer on its own initiative.
    pub fn primary_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    pub fn is_broker(&self) -> bool {
        self.broker
    }
}

impl PartialEq for NodeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeDescriptor {}

impl Hash for NodeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl Debug for NodeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.primary_url() {
            Some(url) => write!(f, "{}@{}", self.id, url),
            None => write!(f, "{}", self.id),
        }
    }
}

impl Display for NodeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_identity_not_url() {
        let first = NodeDescriptor::new(vec!["tcp://10.0.0.1:7000".into()], true);
        let second = NodeDescriptor::new(vec!["tcp://10.0.0.1:7000".into()], true);
        assert_ne!(first, second);

        let alias = NodeDescriptor::with_id(first.id(), vec!["tcp://other:1".into()], false);
        assert_eq!(first, alias);
    }

    #[test]
    fn display_is_short_id_and_url() {
        let node = NodeDescriptor::new(vec!["tcp://a:1".into()], true);
        let shown = node.to_string();
        assert!(shown.ends_with("@tcp://a:1"));
        assert_eq!(shown.split('@').next().map(str::len), Some(7));
    }
}
