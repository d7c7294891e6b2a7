/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Client side of the tree protocol: negotiating with a candidate father, searching the candidate
//! pools for one, and becoming a new root when the search fails.
//!
//! ## Negotiation
//!
//! A negotiation ([`Core::try_candidate`]) opens a link to the candidate, registers the candidate with
//! the [response bucket](crate::response_bucket), sends a [`Request`] and blocks until the response
//! arrives, the link dies, or the response timeout elapses. Only a
//! [`ConnectionAccepted`](crate::messages::ConnectionAccepted) keeps the link open.
//!
//! ## Search
//!
//! A search ([`Core::search_father`]) negotiates with one candidate after another, taken from a
//! [`SearchCaches`] pipeline, and feeds every refusal back into the pipeline:
//!
//! |Refusal|Effect|
//! |---|---|
//! |`BUSY`|The candidate is retried later, after a random pause.|
//! |`NOT_MAX_DEGREE`|The candidate's children are tried, then the candidate itself with the override.|
//! |`NOT_MIN_DEGREE`|The candidate's ancestors are tried, then the candidate itself with the override.|
//! |`NOT_DEPTH_OR_COLOR`|The good candidate it points at, if any, is tried.|
//!
//! Both negotiations and searches hold the [reconfiguration slot](crate::reconfiguration) for their
//! whole duration.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
};

use crate::{
    caches::{CacheKind, ForceFlags, SearchCaches},
    config::Configuration,
    logging::EventLogger,
    messages::{ConnectionAccepted, Message, Request, Response, Update},
    networking::{sending::SenderHandle, TrafficClass, Transport},
    periodic_updater, root_connector,
    reconfiguration::ReconfigurationSlot,
    response_bucket::ResponseBucket,
    ticker::Ticker,
    types::{Depth, NodeDescriptor, NodeId},
};

use super::{state::TreeState, AddNeighborError};

/// The state and collaborators shared by every thread of one topology manager.
pub(crate) struct Core<T: Transport> {
    pub(crate) configuration: Configuration,
    pub(crate) local: NodeDescriptor,
    pub(crate) state: Mutex<TreeState>,
    pub(crate) slot: ReconfigurationSlot,
    pub(crate) bucket: ResponseBucket,
    pub(crate) events: EventLogger,
    transport: Mutex<T>,
    root_connector: Mutex<Option<Ticker>>,
    stopped: AtomicBool,
}

/// How a negotiation that got an answer ended.
pub(crate) enum Negotiation {
    /// The candidate is now the local node's father.
    Accepted(NodeDescriptor),
    /// The candidate refused with the given response.
    Rejected(NodeDescriptor, Response),
    /// The URL designates the local node.
    SelfConnect,
}

impl<T: Transport> Core<T> {
    pub(crate) fn new(configuration: Configuration, transport: T) -> Self {
        let local = transport.local_node();
        let state = TreeState::new(&configuration, &mut rand::thread_rng());
        Self {
            events: EventLogger::new(local.id(), configuration.log_events),
            bucket: ResponseBucket::new(configuration.response_timeout),
            slot: ReconfigurationSlot::new(),
            state: Mutex::new(state),
            transport: Mutex::new(transport),
            root_connector: Mutex::new(None),
            stopped: AtomicBool::new(true),
            configuration,
            local,
        }
    }

    pub(crate) fn sender(&self) -> SenderHandle<T> {
        SenderHandle::new(self.transport.lock().unwrap().clone())
    }

    pub(crate) fn transport(&self) -> T {
        self.transport.lock().unwrap().clone()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn set_stopped(&self, stopped: bool) {
        self.stopped.store(stopped, Ordering::SeqCst)
    }

    pub(crate) fn father(&self) -> Option<NodeDescriptor> {
        self.state.lock().unwrap().father.clone()
    }

    /// Negotiate with the candidate at `url`. The caller must hold the reconfiguration slot.
    pub(crate) fn try_candidate(
        &self,
        url: &str,
        force: ForceFlags,
    ) -> Result<Negotiation, AddNeighborError> {
        let mut sender = self.sender();
        let peer = sender.safe_open(url)?;
        if peer == self.local {
            sender.safe_close(&peer);
            return Ok(Negotiation::SelfConnect);
        }

        let request = {
            let state = self.state.lock().unwrap();
            Request {
                color: state.color.clone(),
                depth: state.depth,
                force_max_degree: force.max_degree,
                force_min_degree: force.min_degree,
            }
        };

        self.bucket.wait_from(peer.clone());
        if let Err(err) = sender.send(&peer, request) {
            self.bucket.cancel(&peer);
            let _ = self.bucket.await_response();
            sender.safe_close(&peer);
            return Err(err.into());
        }

        let response = match self.bucket.await_response() {
            Ok(response) => response,
            Err(err) => {
                log::debug!("Negotiation with {} failed: {}", peer, err);
                sender.safe_close(&peer);
                return Err(AddNeighborError::PeerUnreachable(peer));
            }
        };

        match response {
            Response::ConnectionAccepted(accepted) => {
                self.attach(&mut sender, peer.clone(), accepted);
                Ok(Negotiation::Accepted(peer))
            }
            rejection => {
                sender.safe_close(&peer);
                Ok(Negotiation::Rejected(peer, rejection))
            }
        }
    }

    /// Adopt `father`, which has just accepted the local node, and tell the children about it.
    fn attach(&self, sender: &mut SenderHandle<T>, father: NodeDescriptor, accepted: ConnectionAccepted) {
        let mut rng = rand::thread_rng();
        let mut state = self.state.lock().unwrap();

        state.father = Some(father.clone());
        state.neighbors.confirm(father.clone());
        state.global.remove(&father);
        state.make_cd_greater_than(&accepted.color, accepted.depth, &mut rng);
        state.regional.set_upstream(&accepted.upstream);
        let siblings: Vec<NodeDescriptor> = accepted
            .siblings
            .into_iter()
            .filter(|sibling| *sibling != self.local)
            .collect();
        state.regional.set_siblings(&siblings);

        self.events.attach_to_father(&father.id(), &state.color, state.depth);

        let update = Update {
            color: state.color.clone(),
            depth: state.depth,
            upstream: state.chain_for_children(self.configuration.upstream_max_length),
            hop_to_live: self.configuration.hop_to_live(),
        };
        sender.send_to_all(&state.children(), update);
        drop(state);

        self.cancel_root_connector();
    }

    /// Look for a new father, and become a new root if none is found (unless `root_connector` is set).
    ///
    /// Blocks until the reconfiguration slot is free. Returns the new father, if any.
    pub(crate) fn search_father(
        self: &Arc<Self>,
        dead_father: Option<NodeDescriptor>,
        root_connector: bool,
    ) -> Option<NodeDescriptor> {
        let _slot = self.slot.acquire();
        if self.is_stopped() {
            return None;
        }

        let mut caches = {
            let mut state = self.state.lock().unwrap();
            if let Some(father) = &state.father {
                return Some(father.clone());
            }
            let global = state.global.fork();
            SearchCaches::new(
                self.configuration.cache_try_order.clone(),
                state.regional.clone(),
                global,
                self.configuration.global_cache_max_size,
                self.configuration.busy_retry_delay,
            )
        };

        self.events
            .start_search(dead_father.as_ref().map(NodeDescriptor::id).as_ref(), root_connector);
        log::debug!(
            "Searching for a father among {} regional and {} global candidates",
            caches.size(CacheKind::Regional),
            caches.size(CacheKind::Global)
        );

        let mut rng = rand::thread_rng();
        let mut tried: HashSet<(NodeId, CacheKind)> = HashSet::new();
        let mut tries = 0;
        let found = loop {
            if self.is_stopped() {
                break None;
            }

            let candidate = caches.next_candidate(&mut rng, |node, source| {
                *node != self.local
                    && Some(node) != dead_father.as_ref()
                    && !tried.contains(&(node.id(), source))
                    && !self.state.lock().unwrap().neighbors.contains(node)
            });
            let Some(candidate) = candidate else {
                break None;
            };
            tried.insert((candidate.node.id(), candidate.source));
            tries += 1;

            let Some(url) = candidate.node.primary_url() else {
                continue;
            };

            match self.try_candidate(url, candidate.force) {
                Ok(Negotiation::Accepted(father)) => break Some((father, candidate.source)),
                Ok(Negotiation::SelfConnect) => (),
                Ok(Negotiation::Rejected(peer, response)) => match response {
                    Response::Busy(_) => caches.on_busy(peer),
                    Response::NotMaxDegree(refusal) => caches.on_not_max_degree(peer, refusal.siblings),
                    Response::NotMinDegree(refusal) => caches.on_not_min_degree(peer, refusal.upstream),
                    Response::NotDepthOrColor(refusal) => {
                        if let Some(hint) = refusal.good_candidate.filter(|hint| *hint != self.local) {
                            self.state.lock().unwrap().global.add(hint.clone());
                            caches.on_good_candidate(hint);
                        }
                    }
                    Response::ConnectionAccepted(_) => (),
                },
                Err(err) => log::debug!("Skipping candidate {}: {}", candidate.node, err),
            }
        };

        let outcome = found.as_ref().map(|(father, source)| (father.id(), *source));
        self.events
            .end_search(outcome.as_ref().map(|(father, source)| (father, *source)), tries);

        match found {
            Some((father, _)) => Some(father),
            None => {
                if !root_connector && !self.is_stopped() {
                    self.create_new_tree();
                    self.start_root_connector();
                }
                None
            }
        }
    }

    /// Make the local node the root of a brand new tree. The caller must hold the reconfiguration slot.
    pub(crate) fn create_new_tree(&self) {
        let mut rng = rand::thread_rng();
        let mut state = self.state.lock().unwrap();

        let archived = state.regional.entries();
        let local = self.local.clone();
        state.global.merge(&archived, |candidate| *candidate == local);
        state.regional.clear();
        state.father = None;
        state.father_depth = None;

        let token = self
            .local
            .primary_url()
            .map_or_else(|| self.local.id().to_string(), str::to_string);
        state.color.push_token(token);
        state.depth = Depth::initial(&mut rng);

        self.events.new_tree(&state.color, state.depth);

        let update = Update {
            color: state.color.clone(),
            depth: state.depth,
            upstream: Vec::new(),
            hop_to_live: self.configuration.hop_to_live(),
        };
        self.sender().send_to_all(&state.children(), update);
    }

    /// Run a search for a new father on a thread of its own.
    pub(crate) fn spawn_repair(self: &Arc<Self>, dead_father: NodeDescriptor) {
        let core = Arc::clone(self);
        thread::spawn(move || {
            core.search_father(Some(dead_father), false);
        });
    }

    /// (Re)start the background merge attempts of a root.
    pub(crate) fn start_root_connector(self: &Arc<Self>) {
        let ticker = root_connector::start(Arc::downgrade(self), self.configuration.root_connector_interval);
        if let Some(previous) = self.root_connector.lock().unwrap().replace(ticker) {
            previous.cancel();
        }
    }

    /// Tell the root connector, if any, to exit. Does not wait for it.
    pub(crate) fn cancel_root_connector(&self) {
        if let Some(ticker) = self.root_connector.lock().unwrap().take() {
            ticker.cancel();
        }
    }

    /// Tell the root connector, if any, to exit, and wait for it.
    pub(crate) fn stop_root_connector(&self) {
        let ticker = self.root_connector.lock().unwrap().take();
        if let Some(ticker) = ticker {
            ticker.stop();
        }
    }

    /// Send one round of gossip: a sample of the global cache, to another, disjoint, sample of it.
    pub(crate) fn gossip(&self) {
        let (payload, recipients) = {
            let mut rng = rand::thread_rng();
            let state = self.state.lock().unwrap();
            let payload = state.global.sample(
                self.configuration.gossip_payload_fraction,
                &HashSet::new(),
                &mut rng,
            );
            let ignore: HashSet<NodeDescriptor> = payload.iter().cloned().collect();
            let recipients = state.global.sample(
                self.configuration.gossip_recipient_fraction,
                &ignore,
                &mut rng,
            );
            (payload, recipients)
        };

        if payload.is_empty() || recipients.is_empty() {
            return;
        }

        periodic_updater::send_round(&mut self.sender(), payload.clone(), &recipients);
        self.events.gossip(payload.len(), recipients.len());
    }

    /// Hand `message` to `peer` over a short-lived link.
    pub(crate) fn send_transient(&self, peer: &NodeDescriptor, message: Message) {
        self.sender()
            .send_transient(peer, message, TrafficClass::Control)
    }
}
