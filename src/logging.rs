/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out protocol events.
//!
//! The logs defined in this module are printed if the user enabled them via the manager's
//! [configuration](crate::config::Configuration::log_events).
//!
//! LSTree logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages printed
//! onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least three values. The first three values
//! are always:
//! 1. The name of the event in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//! 3. The first seven characters of the Base64 encoding of the local node's id.
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an accepted child is printed:
//!
//! ```text
//! AcceptChild, 1701329264, Id5u7f6, fNGCJyk, mock://b, 0.9532
//! ```
//!
//! In the snippet:
//! - The fourth value is the short id of the new child.
//! - The fifth value is the color of the local node after accepting the child.
//! - The sixth value is the depth of the local node after accepting the child.

use std::time::SystemTime;

use crate::{
    caches::CacheKind,
    messages::RejectionKind,
    types::{Color, Depth, NodeId},
};

// Names of each event in PascalCase for printing:
pub const ACCEPT_CHILD: &str = "AcceptChild";
pub const REJECT_CHILD: &str = "RejectChild";
pub const ATTACH_TO_FATHER: &str = "AttachToFather";
pub const FATHER_GONE: &str = "FatherGone";
pub const SIBLING_GONE: &str = "SiblingGone";
pub const NEW_TREE: &str = "NewTree";

pub const START_SEARCH: &str = "StartSearch";
pub const END_SEARCH: &str = "EndSearch";

pub const GOSSIP: &str = "Gossip";
pub const PROTOCOL_VIOLATION: &str = "ProtocolViolation";

/// Emits the event lines of one node, if enabled.
#[derive(Clone, Copy)]
pub(crate) struct EventLogger {
    local: NodeId,
    enabled: bool,
}

impl EventLogger {
    pub(crate) fn new(local: NodeId, enabled: bool) -> Self {
        Self { local, enabled }
    }

    pub(crate) fn accept_child(&self, child: &NodeId, color: &Color, depth: Depth) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                ACCEPT_CHILD,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                child,
                color,
                depth
            )
        }
    }

    pub(crate) fn reject_child(&self, requester: &NodeId, reason: RejectionKind) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}, {:?}",
                REJECT_CHILD,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                requester,
                reason
            )
        }
    }

    pub(crate) fn attach_to_father(&self, father: &NodeId, color: &Color, depth: Depth) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                ATTACH_TO_FATHER,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                father,
                color,
                depth
            )
        }
    }

    pub(crate) fn father_gone(&self, father: &NodeId) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}",
                FATHER_GONE,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                father
            )
        }
    }

    pub(crate) fn sibling_gone(&self, sibling: &NodeId) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}",
                SIBLING_GONE,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                sibling
            )
        }
    }

    pub(crate) fn new_tree(&self, color: &Color, depth: Depth) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}, {}",
                NEW_TREE,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                color,
                depth
            )
        }
    }

    pub(crate) fn start_search(&self, dead_father: Option<&NodeId>, root_connector: bool) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}, {}",
                START_SEARCH,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                dead_father.map_or_else(|| String::from("-"), NodeId::to_string),
                root_connector
            )
        }
    }

    /// `found` is the new father and the pool it came from, or `None` if every pool ran dry.
    pub(crate) fn end_search(&self, found: Option<(&NodeId, CacheKind)>, tries: usize) {
        if self.enabled {
            let (father, source) = match found {
                Some((father, source)) => (father.to_string(), source.token()),
                None => (String::from("-"), "-"),
            };
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                END_SEARCH,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                father,
                source,
                tries
            )
        }
    }

    pub(crate) fn gossip(&self, payload: usize, recipients: usize) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}, {}",
                GOSSIP,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                payload,
                recipients
            )
        }
    }

    pub(crate) fn protocol_violation(&self, origin: &NodeId, subject: &str) {
        if self.enabled {
            log::info!(
                "{}, {}, {}, {}, {}",
                PROTOCOL_VIOLATION,
                secs_since_unix_epoch(SystemTime::now()),
                self.local,
                origin,
                subject
            )
        }
    }
}

pub(crate) fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_secs())
        .unwrap_or(0)
}
