use log::LevelFilter;
use lstree::{config::Configuration, messages::PeriodicUpdate};

mod common;

use crate::common::{
    logging::setup_logger,
    network::MockNetwork,
    node::{fast_configuration, wait_until, Node, RawPeer},
};

#[test]
fn periodic_update_spreads_candidates_test() {
    setup_logger(LevelFilter::Debug);
    let network = MockNetwork::new();
    let gossiping = Configuration {
        gossip_payload_fraction: 0.5,
        gossip_recipient_fraction: 1.0,
        ..fast_configuration()
    };
    let n = Node::start(&network, "mock://n", gossiping);
    let x = Node::start(&network, "mock://x", fast_configuration());
    let y = Node::start(&network, "mock://y", fast_configuration());

    // 1. Seed N's global cache with X and Y.
    let mut raw = RawPeer::new(&network, "mock://raw");
    let peer = raw.open(n.url());
    raw.send(
        &peer,
        PeriodicUpdate {
            candidates: vec![x.local_node(), y.local_node(), n.local_node()],
        },
    );
    raw.close(&peer);

    // 2. N never caches itself.
    wait_until("N caches X and Y", || {
        let candidates = n.global_candidates();
        candidates.contains(&x.local_node()) && candidates.contains(&y.local_node())
    });
    assert!(!n.global_candidates().contains(&n.local_node()));

    // 3. Every round N tells one of them about the other.
    wait_until("X or Y learns about the other", || {
        x.global_candidates().contains(&y.local_node())
            || y.global_candidates().contains(&x.local_node())
    });
}
