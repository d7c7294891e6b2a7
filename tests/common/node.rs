use std::{
    ops::Deref,
    thread,
    time::{Duration, Instant},
};

use lstree::{
    config::Configuration,
    manager::TopologyManager,
    messages::{Message, Request},
    networking::{TrafficClass, Transport, TransportEvent},
    types::{Color, Depth, NodeDescriptor},
};

use super::network::{MockNetwork, MockTransport};

/// How long tests wait for the overlay to settle before giving up.
pub(crate) const SETTLE_TIMEOUT: Duration = Duration::from_secs(20);

/// A configuration with intervals short enough for tests to observe several rounds of every
/// background task.
pub(crate) fn fast_configuration() -> Configuration {
    Configuration::builder()
        .busy_retry_delay(Duration::from_millis(50))
        .periodic_update_interval(Duration::from_millis(200))
        .root_connector_interval(Duration::from_millis(200))
        .response_timeout(Duration::from_secs(2))
        .build()
}

/// A started topology manager, and the url it can be reached at.
pub(crate) struct Node {
    url: String,
    manager: TopologyManager<MockTransport>,
}

impl Node {
    pub(crate) fn start(network: &MockNetwork, url: &str, configuration: Configuration) -> Node {
        let mut manager = TopologyManager::new(configuration, network.join(url));
        manager.start();
        Node {
            url: url.to_string(),
            manager,
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }
}

impl Deref for Node {
    type Target = TopologyManager<MockTransport>;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

/// Poll `condition` until it holds, panicking with `what` if it does not within [`SETTLE_TIMEOUT`].
pub(crate) fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while !condition() {
        if Instant::now() > deadline {
            panic!("Timed out waiting until {}", what);
        }
        thread::sleep(Duration::from_millis(20));
    }
}

/// A raw endpoint on the network that speaks the tree protocol by hand.
pub(crate) struct RawPeer {
    transport: MockTransport,
}

impl RawPeer {
    pub(crate) fn new(network: &MockNetwork, url: &str) -> RawPeer {
        RawPeer {
            transport: network.join(url),
        }
    }

    pub(crate) fn local_node(&self) -> NodeDescriptor {
        self.transport.local_node()
    }

    pub(crate) fn open(&mut self, url: &str) -> NodeDescriptor {
        self.transport.open_link(url).unwrap()
    }

    pub(crate) fn close(&mut self, peer: &NodeDescriptor) {
        self.transport.close_link(peer)
    }

    pub(crate) fn send(&mut self, peer: &NodeDescriptor, message: impl Into<Message>) {
        self.transport
            .send(peer, message.into(), TrafficClass::Control)
            .unwrap()
    }

    pub(crate) fn request(&mut self, peer: &NodeDescriptor, color: Color, depth: f64) {
        self.send(
            peer,
            Request {
                color,
                depth: Depth::new(depth),
                force_max_degree: false,
                force_min_degree: false,
            },
        )
    }

    /// The next message that arrives within `timeout`, skipping link events.
    pub(crate) fn next_message(&mut self, timeout: Duration) -> Option<(NodeDescriptor, Message)> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.transport.recv() {
                Some(TransportEvent::Message { origin, message }) => return Some((origin, message)),
                Some(_) => (),
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
        None
    }
}
