/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`Transport`] trait and the types that cross it.

use std::fmt::{self, Display, Formatter};

use crate::{messages::Message, types::NodeDescriptor};

/// The link layer that the tree protocol drives.
///
/// ## Link ownership
///
/// Links are shared: the tree protocol, the layer above it, and the transport itself may all hold the
/// same link open at once. Implementations must therefore reference-count links, so that
/// [`open_link`](Transport::open_link) on an already open link takes another reference, and
/// [`close_link`](Transport::close_link) only tears the link down once every reference is released.
///
/// ## Events
///
/// Inbound messages and link state changes are reported by [`recv`](Transport::recv), which is polled
/// from a dedicated thread. When the last reference to a link is released, or the link dies, the
/// *other* side must observe a [`TransportEvent::LinkClosed`] or [`TransportEvent::LinkDead`].
pub trait Transport: Clone + Send + 'static {
    /// The identity of the local process, as peers will see it.
    fn local_node(&self) -> NodeDescriptor;

    /// Resolve `url` and open (or take another reference to) a link to the peer it designates.
    ///
    /// If the link was already open, implementations may either return `Ok` or report
    /// [`LinkError::AlreadyLinked`] with the identity of the existing peer; in both cases a reference
    /// has been taken.
    fn open_link(&mut self, url: &str) -> Result<NodeDescriptor, LinkError>;

    /// Release one reference to the link to `peer`.
    fn close_link(&mut self, peer: &NodeDescriptor);

    /// Queue `message` on the link to `peer` without blocking. Fails if no link to `peer` is open.
    fn send(
        &mut self,
        peer: &NodeDescriptor,
        message: Message,
        class: TrafficClass,
    ) -> Result<(), SendError>;

    /// Receive the next event. Returns immediately with a `None` if no event is available now.
    fn recv(&mut self) -> Option<TransportEvent>;
}

/// Queue that a message should travel in. Transports may prioritize control traffic over gossip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    /// Requests, responses and tree maintenance.
    Control,
    /// Candidate gossip and hints; may be delayed or dropped under load.
    Gossip,
}

/// Something that happened on the wire.
#[derive(Clone, Debug)]
pub enum TransportEvent {
    /// `origin` sent `message` over an open link.
    Message {
        origin: NodeDescriptor,
        message: Message,
    },

    /// A peer opened a link to the local node.
    LinkOpened(NodeDescriptor),

    /// The link to this peer was closed in an orderly way.
    LinkClosed(NodeDescriptor),

    /// The link to this peer was found dead.
    LinkDead(NodeDescriptor),
}

/// The ways [`Transport::open_link`] can fail.
#[derive(Clone, Debug)]
pub enum LinkError {
    /// The URL could not be parsed or resolved to a transport.
    MalformedUrl(String),

    /// Nothing answered at the URL.
    ConnectionRefused(String),

    /// A link to the peer already exists. A reference to it has been taken nonetheless.
    AlreadyLinked(NodeDescriptor),
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::MalformedUrl(url) => write!(f, "malformed url: {}", url),
            LinkError::ConnectionRefused(url) => write!(f, "connection refused: {}", url),
            LinkError::AlreadyLinked(peer) => write!(f, "already linked to {}", peer),
        }
    }
}

impl std::error::Error for LinkError {}

/// The ways [`Transport::send`] can fail.
#[derive(Clone, Debug)]
pub enum SendError {
    NotConnected(NodeDescriptor),
}

impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NotConnected(peer) => write!(f, "not connected to {}", peer),
        }
    }
}

impl std::error::Error for SendError {}
