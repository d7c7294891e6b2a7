/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for sending messages through the [`Transport`].

use crate::{messages::Message, types::NodeDescriptor};

use super::transport::{LinkError, SendError, TrafficClass, Transport};

/// Handle for opening and closing links and sending messages through the [`Transport`].
///
/// It can be used to send instances of any type that implement the [`Into<Message>`] trait.
#[derive(Clone)]
pub(crate) struct SenderHandle<T: Transport> {
    transport: T,
}

impl<T: Transport> SenderHandle<T> {
    pub(crate) fn new(transport: T) -> Self {
        Self { transport }
    }

    pub(crate) fn send<M: Into<Message>>(
        &mut self,
        peer: &NodeDescriptor,
        msg: M,
    ) -> Result<(), SendError> {
        self.transport.send(peer, msg.into(), TrafficClass::Control)
    }

    /// Send `msg` to each of `peers` over already open links, logging (but otherwise ignoring) failures.
    pub(crate) fn send_to_all<'a, M: Into<Message>>(
        &mut self,
        peers: impl IntoIterator<Item = &'a NodeDescriptor>,
        msg: M,
    ) {
        let msg = msg.into();
        for peer in peers {
            if let Err(err) = self.transport.send(peer, msg.clone(), TrafficClass::Control) {
                log::debug!("Could not send {} to {}: {}", msg.subject(), peer, err);
            }
        }
    }

    /// Open a link to `url`, or take another reference to it if it is already open.
    pub(crate) fn safe_open(&mut self, url: &str) -> Result<NodeDescriptor, LinkError> {
        match self.transport.open_link(url) {
            Ok(peer) | Err(LinkError::AlreadyLinked(peer)) => Ok(peer),
            Err(err) => Err(err),
        }
    }

    /// Release the reference to the link to `peer` taken by [`safe_open`](Self::safe_open).
    pub(crate) fn safe_close(&mut self, peer: &NodeDescriptor) {
        self.transport.close_link(peer)
    }

    /// Open a short-lived link to `peer`, send `msg` on it, and release the link.
    ///
    /// Failures are logged and otherwise ignored: everything sent this way is a hint that the
    /// receiver can live without.
    pub(crate) fn send_transient<M: Into<Message>>(
        &mut self,
        peer: &NodeDescriptor,
        msg: M,
        class: TrafficClass,
    ) {
        let msg = msg.into();
        let Some(url) = peer.primary_url() else {
            log::debug!("Cannot send {} to {}: no known url", msg.subject(), peer);
            return;
        };

        let linked = match self.safe_open(url) {
            Ok(linked) => linked,
            Err(err) => {
                log::debug!("Cannot send {} to {}: {}", msg.subject(), peer, err);
                return;
            }
        };

        let subject = msg.subject();
        if let Err(err) = self.transport.send(&linked, msg, class) {
            log::debug!("Could not send {} to {}: {}", subject, linked, err);
        }
        self.safe_close(&linked);
    }
}
