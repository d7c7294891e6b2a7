/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build, run, and query a topology manager.
//!
//! A [`TopologyManager`] arranges the local broker and its peers into a tree, together with every
//! other manager reachable through the [`Transport`]. It runs three background threads:
//! 1. The poller, which drains the transport and answers requests and maintenance messages.
//! 2. The [root connector](crate::root_connector), which runs only while the local node is a root.
//! 3. The [periodic updater](crate::periodic_updater), which gossips known candidates.
//!
//! ## Starting a manager
//!
//! ```ignore
//! let mut manager = TopologyManager::new(configuration, transport);
//! manager.start();
//!
//! // Join the tree of a known broker.
//! let father = manager.add_neighbor("mock://broker")?;
//! ```
//!
//! A started manager keeps repairing the tree on its own: when its father goes away it searches for
//! another, and becomes the root of a new tree if it finds none. Dropping the manager stops it.

pub(crate) mod admission;

pub(crate) mod dispatch;

pub(crate) mod protocol;

pub(crate) mod state;

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    sync::{
        mpsc::{self, Sender},
        Arc,
    },
    thread::JoinHandle,
};

use crate::{
    caches::ForceFlags,
    config::Configuration,
    messages::{Message, RejectionKind, Response},
    networking::{receiving::start_polling, LinkError, SendError, Transport},
    periodic_updater,
    ticker::Ticker,
    types::{Color, Depth, NodeDescriptor},
};

use protocol::{Core, Negotiation};

/// A handle to the threads of a topology manager. When this value is dropped, all threads are
/// gracefully shut down.
pub struct TopologyManager<T: Transport> {
    core: Arc<Core<T>>,
    poller: Option<JoinHandle<()>>,
    poller_shutdown: Option<Sender<()>>,
    periodic_updater: Option<Ticker>,
}

impl<T: Transport> TopologyManager<T> {
    /// Create a stopped manager for the node that `transport` belongs to. The node starts out as a
    /// colorless root.
    pub fn new(configuration: Configuration, transport: T) -> Self {
        Self {
            core: Arc::new(Core::new(configuration, transport)),
            poller: None,
            poller_shutdown: None,
            periodic_updater: None,
        }
    }

    /// Start the poller, the periodic updater, and (since the node is a root) the root connector. Does
    /// nothing if the manager is already running.
    pub fn start(&mut self) {
        if self.poller.is_some() {
            return;
        }
        self.core.set_stopped(false);

        let (poller_shutdown, poller_shutdown_receiver) = mpsc::channel();
        let core = self.core.clone();
        self.poller = Some(start_polling(
            self.core.transport(),
            poller_shutdown_receiver,
            move |event| core.on_event(event),
        ));
        self.poller_shutdown = Some(poller_shutdown);

        self.periodic_updater = Some(periodic_updater::start(
            self.core.clone(),
            self.core.configuration.periodic_update_interval,
        ));

        if self.core.father().is_none() {
            self.core.start_root_connector();
        }
    }

    /// Signal every thread to exit and wait for them. Negotiations already in flight are left to
    /// finish or time out on their own.
    pub fn stop(&mut self) {
        self.core.set_stopped(true);

        if let Some(periodic_updater) = self.periodic_updater.take() {
            periodic_updater.stop();
        }

        self.core.stop_root_connector();

        if let Some(shutdown) = self.poller_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(poller) = self.poller.take() {
            let _ = poller.join();
        }
    }

    /// Attach the local node beneath the broker at `url`.
    ///
    /// Fails fast if the local node already has a father, and otherwise blocks until no other
    /// reconfiguration is in flight. If `url` designates the local node itself, returns the local node
    /// without changing anything.
    pub fn add_neighbor(&self, url: &str) -> Result<NodeDescriptor, AddNeighborError> {
        if self.core.is_stopped() {
            return Err(AddNeighborError::Stopped);
        }
        if let Some(father) = self.core.father() {
            return Err(AddNeighborError::AlreadyAttached(father));
        }

        let _slot = self.core.slot.acquire();
        if let Some(father) = self.core.father() {
            return Err(AddNeighborError::AlreadyAttached(father));
        }

        match self.core.try_candidate(url, ForceFlags::NONE)? {
            Negotiation::Accepted(father) => Ok(father),
            Negotiation::SelfConnect => Ok(self.core.local.clone()),
            Negotiation::Rejected(_, response) => {
                if let Response::NotDepthOrColor(refusal) = &response {
                    if let Some(hint) = refusal.good_candidate.as_ref() {
                        self.core.state.lock().unwrap().global.add(hint.clone());
                    }
                }
                Err(AddNeighborError::Rejected(
                    response.rejection_kind().unwrap_or(RejectionKind::NotDepthOrColor),
                ))
            }
        }
    }

    /// Tear down the tree edge to `peer`.
    ///
    /// `peer` is told that it is no longer a child, and the local node reacts as if the link to `peer`
    /// had died: removing the father starts a search for a new one.
    pub fn remove_neighbor(&self, peer: &NodeDescriptor) {
        if !self.core.state.lock().unwrap().neighbors.contains(peer) {
            return;
        }
        if let Err(err) = self.core.sender().send(peer, Message::NoLongerChild) {
            log::debug!("Could not notify {}: {}", peer, err);
        }
        self.core.neighbor_gone(peer);
    }

    /// Make the local node the root of a brand new tree, leaving its current father if it has one.
    pub fn create_new_tree(&self) {
        let _slot = self.core.slot.acquire();
        if let Some(father) = self.core.father() {
            if let Err(err) = self.core.sender().send(&father, Message::NoLongerChild) {
                log::debug!("Could not notify {}: {}", father, err);
            }
            let mut state = self.core.state.lock().unwrap();
            state.neighbors.remove(&father);
            drop(state);
            self.core.sender().safe_close(&father);
        }
        self.core.create_new_tree();
        if !self.core.is_stopped() {
            self.core.start_root_connector();
        }
    }

    pub fn local_node(&self) -> NodeDescriptor {
        self.core.local.clone()
    }

    /// The local node's father, or `None` if it is the root of its tree.
    pub fn father(&self) -> Option<NodeDescriptor> {
        self.core.father()
    }

    pub fn color(&self) -> Color {
        self.core.state.lock().unwrap().color.clone()
    }

    pub fn depth(&self) -> Depth {
        self.core.state.lock().unwrap().depth
    }

    /// Number of neighboring brokers, father included.
    pub fn number_of_brokers(&self) -> usize {
        self.core.state.lock().unwrap().neighbors.number_of_brokers()
    }

    pub fn number_of_clients(&self) -> usize {
        self.core.state.lock().unwrap().neighbors.number_of_clients()
    }

    /// Every neighbor, brokers and clients alike.
    pub fn neighbors(&self) -> HashSet<NodeDescriptor> {
        self.core.state.lock().unwrap().neighbors.all()
    }

    /// The known ancestors above the father, closest first.
    pub fn upstream(&self) -> Vec<NodeDescriptor> {
        self.core.state.lock().unwrap().regional.upstream_chain()
    }

    /// The known other children of the father.
    pub fn siblings(&self) -> Vec<NodeDescriptor> {
        self.core.state.lock().unwrap().regional.siblings()
    }

    /// The candidates known from other trees, oldest first.
    pub fn global_candidates(&self) -> Vec<NodeDescriptor> {
        self.core.state.lock().unwrap().global.snapshot()
    }
}

impl<T: Transport> Drop for TopologyManager<T> {
    fn drop(&mut self) {
        self.stop()
    }
}

/// The ways [`TopologyManager::add_neighbor`] can fail.
#[derive(Clone, Debug)]
pub enum AddNeighborError {
    /// The local node already has this father.
    AlreadyAttached(NodeDescriptor),

    /// No link could be opened to the candidate.
    Link(LinkError),

    /// The request could not be sent to the candidate.
    Send(SendError),

    /// The candidate refused.
    Rejected(RejectionKind),

    /// The candidate did not answer in time, or its link died while waiting.
    PeerUnreachable(NodeDescriptor),

    /// The manager is not running.
    Stopped,
}

impl Display for AddNeighborError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AddNeighborError::AlreadyAttached(father) => write!(f, "already attached beneath {}", father),
            AddNeighborError::Link(err) => write!(f, "{}", err),
            AddNeighborError::Send(err) => write!(f, "{}", err),
            AddNeighborError::Rejected(kind) => write!(f, "rejected: {:?}", kind),
            AddNeighborError::PeerUnreachable(peer) => write!(f, "{} is unreachable", peer),
            AddNeighborError::Stopped => f.write_str("the manager is stopped"),
        }
    }
}

impl std::error::Error for AddNeighborError {}

impl From<LinkError> for AddNeighborError {
    fn from(value: LinkError) -> Self {
        AddNeighborError::Link(value)
    }
}

impl From<SendError> for AddNeighborError {
    fn from(value: SendError) -> Self {
        AddNeighborError::Send(value)
    }
}
