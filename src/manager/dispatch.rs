/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Handlers for the events the poller thread receives from the transport.
//!
//! Every handler runs on the poller thread and holds the state lock only briefly. Anything that may
//! block for longer (a search for a new father) is moved to a thread of its own.

use std::sync::Arc;

use crate::{
    messages::{Message, NewSibling, PeriodicUpdate, Response, SiblingDead, Update},
    networking::{Transport, TransportEvent},
    types::NodeDescriptor,
};

use super::protocol::Core;

impl<T: Transport> Core<T> {
    pub(crate) fn on_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Message { origin, message } => self.on_message(origin, message),
            TransportEvent::LinkOpened(peer) => {
                if !peer.is_broker() {
                    self.state.lock().unwrap().neighbors.confirm(peer);
                }
            }
            TransportEvent::LinkClosed(peer) | TransportEvent::LinkDead(peer) => {
                self.bucket.cancel(&peer);
                self.neighbor_gone(&peer);
            }
        }
    }

    fn on_message(self: &Arc<Self>, origin: NodeDescriptor, message: Message) {
        match message {
            Message::Request(request) => self.examine_request(origin, request),
            Message::Response(response) => self.on_response(origin, response),
            Message::SiblingDead(sibling_dead) => self.on_sibling_dead(origin, sibling_dead),
            Message::Update(update) => self.on_update(origin, update),
            Message::NewSibling(new_sibling) => self.on_new_sibling(origin, new_sibling),
            Message::PeriodicUpdate(periodic_update) => self.on_periodic_update(periodic_update),
            Message::GoodCandidate(good_candidate) => {
                if good_candidate.candidate != self.local {
                    self.state
                        .lock()
                        .unwrap()
                        .global
                        .set_good_candidate(good_candidate.candidate);
                }
            }
            Message::NoLongerChild => self.neighbor_gone(&origin),
        }
    }

    /// Remove `peer` from the neighbors, and repair whatever its departure broke.
    pub(crate) fn neighbor_gone(self: &Arc<Self>, peer: &NodeDescriptor) {
        let mut state = self.state.lock().unwrap();
        let was_broker = state.neighbors.is_broker(peer);
        if !state.neighbors.remove(peer) || !was_broker {
            return;
        }
        let mut sender = self.sender();
        sender.safe_close(peer);

        if state.is_father(peer) {
            state.father = None;
            state.father_depth = None;
            drop(state);

            self.events.father_gone(&peer.id());
            self.cancel_root_connector();
            if !self.is_stopped() {
                self.spawn_repair(peer.clone());
            }
        } else {
            self.events.sibling_gone(&peer.id());
            let sibling_dead = SiblingDead {
                color: state.color.clone(),
                depth: state.depth,
                global_cache: state.global.snapshot(),
                dead: peer.clone(),
            };
            sender.send_to_all(&state.children(), sibling_dead);
        }
    }

    fn on_response(&self, origin: NodeDescriptor, response: Response) {
        let late_accept = response.is_accept();
        let subject = response.subject();
        if let Err(err) = self.bucket.deliver(&origin, response) {
            log::warn!("Dropping {} from {}: {}", subject, origin, err);
            self.events.protocol_violation(&origin.id(), subject);
            if late_accept {
                self.send_transient(&origin, Message::NoLongerChild);
            }
        }
    }

    fn on_sibling_dead(&self, origin: NodeDescriptor, sibling_dead: SiblingDead) {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if !state.is_father(&origin) {
            return;
        }
        state.regional.remove_sibling(&sibling_dead.dead);
        state.father_depth = Some(sibling_dead.depth);
        state.global.merge(&sibling_dead.global_cache, |candidate| {
            *candidate == self.local
                || *candidate == sibling_dead.dead
                || state.neighbors.contains(candidate)
                || state.regional.contains(candidate)
        });
    }

    fn on_update(&self, origin: NodeDescriptor, update: Update) {
        let mut rng = rand::thread_rng();
        let mut state = self.state.lock().unwrap();
        if !state.is_father(&origin) {
            log::debug!("Ignoring UPDATE from {}, which is not the father", origin);
            return;
        }

        state.regional.set_upstream(&update.upstream);
        let (color_changed, depth_changed) =
            state.make_cd_greater_than(&update.color, update.depth, &mut rng);

        if color_changed || depth_changed || update.hop_to_live > 0 {
            let propagated = Update {
                color: state.color.clone(),
                depth: state.depth,
                upstream: state.chain_for_children(self.configuration.upstream_max_length),
                hop_to_live: update.hop_to_live.saturating_sub(1),
            };
            self.sender().send_to_all(&state.children(), propagated);
        }
    }

    fn on_new_sibling(&self, origin: NodeDescriptor, new_sibling: NewSibling) {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if !state.is_father(&origin) || new_sibling.sibling == self.local {
            return;
        }

        state.father_depth = Some(new_sibling.depth);
        state.regional.set_upstream(&new_sibling.upstream);
        for sibling in new_sibling
            .siblings
            .into_iter()
            .chain(std::iter::once(new_sibling.sibling))
            .filter(|sibling| *sibling != self.local)
        {
            state.regional.add_sibling(sibling);
        }

        state.global.merge(&new_sibling.global_cache, |candidate| {
            *candidate == self.local
                || state.neighbors.contains(candidate)
                || state.regional.contains(candidate)
        });
    }

    fn on_periodic_update(&self, periodic_update: PeriodicUpdate) {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.global.merge(&periodic_update.candidates, |candidate| {
            *candidate == self.local
                || state.neighbors.contains(candidate)
                || state.regional.contains(candidate)
        });
    }
}
