use std::{
    collections::HashMap,
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
};

use borsh::{BorshDeserialize, BorshSerialize};
use lstree::{
    messages::Message,
    networking::{LinkError, SendError, TrafficClass, Transport, TransportEvent},
    types::{NodeDescriptor, NodeId},
};

const SCHEME: &str = "mock://";

/// What travels through a node's inbox. Messages travel serialized, as they would on a real wire.
enum Frame {
    Message(NodeDescriptor, Vec<u8>),
    Opened(NodeDescriptor),
    Closed(NodeDescriptor),
    Dead(NodeDescriptor),
}

struct Endpoint {
    node: NodeDescriptor,
    inbox: Sender<Frame>,
    alive: bool,
}

#[derive(Default)]
struct Fabric {
    endpoints: HashMap<String, Endpoint>,
    urls: HashMap<NodeId, String>,
    /// Reference counts of the open links. A link is shared by both of its ends.
    links: HashMap<(NodeId, NodeId), usize>,
}

impl Fabric {
    fn deliver(&self, to: &NodeDescriptor, frame: Frame) {
        if let Some(endpoint) = self
            .urls
            .get(&to.id())
            .and_then(|url| self.endpoints.get(url))
        {
            if endpoint.alive {
                let _ = endpoint.inbox.send(frame);
            }
        }
    }
}

fn link_key(a: &NodeDescriptor, b: &NodeDescriptor) -> (NodeId, NodeId) {
    if a.id() <= b.id() {
        (a.id(), b.id())
    } else {
        (b.id(), a.id())
    }
}

/// A mock network that passes frames between threads using channels, and keeps reference-counted
/// links between the nodes registered on it.
#[derive(Clone, Default)]
pub(crate) struct MockNetwork {
    fabric: Arc<Mutex<Fabric>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a fresh broker at `url` and return its transport.
    pub(crate) fn join(&self, url: &str) -> MockTransport {
        let node = NodeDescriptor::new(vec![url.to_string()], true);
        let (inbox, receiver) = mpsc::channel();

        let mut fabric = self.fabric.lock().unwrap();
        fabric.urls.insert(node.id(), url.to_string());
        fabric.endpoints.insert(
            url.to_string(),
            Endpoint {
                node: node.clone(),
                inbox,
                alive: true,
            },
        );

        MockTransport {
            local: node,
            fabric: self.fabric.clone(),
            inbox: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Crash the node at `url`: every link it had dies, and it becomes unreachable.
    pub(crate) fn kill(&self, url: &str) {
        let mut fabric = self.fabric.lock().unwrap();
        let Some(endpoint) = fabric.endpoints.get_mut(url) else {
            return;
        };
        endpoint.alive = false;
        let dead = endpoint.node.clone();

        let severed: Vec<(NodeId, NodeId)> = fabric
            .links
            .keys()
            .filter(|(a, b)| *a == dead.id() || *b == dead.id())
            .copied()
            .collect();
        for key in severed {
            fabric.links.remove(&key);
            let other = if key.0 == dead.id() { key.1 } else { key.0 };
            let peer = fabric
                .urls
                .get(&other)
                .and_then(|url| fabric.endpoints.get(url))
                .map(|endpoint| endpoint.node.clone());
            if let Some(peer) = peer {
                fabric.deliver(&peer, Frame::Dead(dead.clone()));
            }
        }
    }
}

/// One node's view of a [`MockNetwork`].
#[derive(Clone)]
pub(crate) struct MockTransport {
    local: NodeDescriptor,
    fabric: Arc<Mutex<Fabric>>,
    inbox: Arc<Mutex<Receiver<Frame>>>,
}

impl Transport for MockTransport {
    fn local_node(&self) -> NodeDescriptor {
        self.local.clone()
    }

    fn open_link(&mut self, url: &str) -> Result<NodeDescriptor, LinkError> {
        if !url.starts_with(SCHEME) {
            return Err(LinkError::MalformedUrl(url.to_string()));
        }

        let mut fabric = self.fabric.lock().unwrap();
        let peer = match fabric.endpoints.get(url) {
            Some(endpoint) if endpoint.alive => endpoint.node.clone(),
            _ => return Err(LinkError::ConnectionRefused(url.to_string())),
        };
        if peer == self.local {
            return Ok(peer);
        }

        let references = fabric.links.entry(link_key(&self.local, &peer)).or_insert(0);
        *references += 1;
        if *references > 1 {
            return Err(LinkError::AlreadyLinked(peer));
        }
        fabric.deliver(&peer, Frame::Opened(self.local.clone()));
        Ok(peer)
    }

    fn close_link(&mut self, peer: &NodeDescriptor) {
        let mut fabric = self.fabric.lock().unwrap();
        let key = link_key(&self.local, peer);
        let Some(references) = fabric.links.get_mut(&key) else {
            return;
        };
        *references -= 1;
        if *references == 0 {
            fabric.links.remove(&key);
            fabric.deliver(peer, Frame::Closed(self.local.clone()));
        }
    }

    fn send(
        &mut self,
        peer: &NodeDescriptor,
        message: Message,
        _: TrafficClass,
    ) -> Result<(), SendError> {
        let fabric = self.fabric.lock().unwrap();
        if !fabric.links.contains_key(&link_key(&self.local, peer)) {
            return Err(SendError::NotConnected(peer.clone()));
        }
        let bytes = message.try_to_vec().unwrap();
        fabric.deliver(peer, Frame::Message(self.local.clone(), bytes));
        Ok(())
    }

    fn recv(&mut self) -> Option<TransportEvent> {
        let frame = match self.inbox.lock().unwrap().try_recv() {
            Ok(frame) => frame,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => panic!(),
        };

        Some(match frame {
            Frame::Message(origin, bytes) => TransportEvent::Message {
                origin,
                message: Message::try_from_slice(&bytes).unwrap(),
            },
            Frame::Opened(peer) => TransportEvent::LinkOpened(peer),
            Frame::Closed(peer) => TransportEvent::LinkClosed(peer),
            Frame::Dead(peer) => TransportEvent::LinkDead(peer),
        })
    }
}
