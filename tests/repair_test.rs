use log::LevelFilter;
use lstree::{config::Configuration, messages::PeriodicUpdate};

mod common;

use crate::common::{
    logging::setup_logger,
    network::MockNetwork,
    node::{fast_configuration, wait_until, Node, RawPeer},
};

#[test]
fn orphan_becomes_new_root_test() {
    setup_logger(LevelFilter::Debug);
    let network = MockNetwork::new();
    let f = Node::start(&network, "mock://f", fast_configuration());
    let c = Node::start(&network, "mock://c", fast_configuration());
    f.create_new_tree();
    c.add_neighbor(f.url()).unwrap();
    let inherited = c.color();
    assert_eq!(inherited.len(), 1);

    // 1. Crash F.
    let f_url = f.url().to_string();
    drop(f);
    network.kill(&f_url);

    // 2. C has no other candidate, so it starts a tree of its own, one color token longer.
    wait_until("C becomes the root of a new tree", || {
        c.father().is_none() && c.color().len() == 2
    });
    let color = c.color();
    assert_eq!(color.tokens()[0], inherited.tokens()[0]);
    assert_eq!(color.tokens()[1], c.url());
    assert_eq!(c.number_of_brokers(), 0);
    assert!(c.upstream().is_empty());
}

#[test]
fn orphaned_siblings_reunite_test() {
    setup_logger(LevelFilter::Debug);
    let network = MockNetwork::new();
    let f = Node::start(&network, "mock://f", fast_configuration());
    let c1 = Node::start(&network, "mock://c1", fast_configuration());
    let c2 = Node::start(&network, "mock://c2", fast_configuration());
    f.create_new_tree();
    c1.add_neighbor(f.url()).unwrap();
    c2.add_neighbor(f.url()).unwrap();
    wait_until("C1 knows C2 as its sibling", || {
        c1.siblings().contains(&c2.local_node())
    });

    // 1. Crash their father.
    let f_url = f.url().to_string();
    drop(f);
    network.kill(&f_url);

    // 2. Whether through the repair itself, or later through a root connector, one sibling ends up
    //    beneath the other.
    wait_until("one sibling is the father of the other", || {
        let c1_under_c2 = c1.father() == Some(c2.local_node());
        let c2_under_c1 = c2.father() == Some(c1.local_node());
        c1_under_c2 != c2_under_c1
    });
    wait_until("both siblings share a color", || c1.color() == c2.color());

    let (root, child) = if c1.father().is_none() {
        (&c1, &c2)
    } else {
        (&c2, &c1)
    };
    assert!(root.depth() < child.depth());
    assert_eq!(root.number_of_brokers(), 1);
}

#[test]
fn remove_neighbor_detaches_both_sides_test() {
    setup_logger(LevelFilter::Debug);
    let network = MockNetwork::new();
    let f = Node::start(&network, "mock://f", fast_configuration());
    let c = Node::start(&network, "mock://c", fast_configuration());
    f.create_new_tree();
    c.add_neighbor(f.url()).unwrap();
    wait_until("F has one broker neighbor", || f.number_of_brokers() == 1);

    c.remove_neighbor(&f.local_node());

    wait_until("F forgets C", || f.number_of_brokers() == 0);
    wait_until("C becomes a root", || {
        c.father().is_none() && c.color().len() == 2
    });
}

#[test]
fn full_candidate_redirects_orphan_to_its_children_test() {
    setup_logger(LevelFilter::Debug);
    let network = MockNetwork::new();
    let bounded = Configuration {
        max_degree: 2,
        ..fast_configuration()
    };
    let f = Node::start(&network, "mock://f", bounded);
    let s = Node::start(&network, "mock://s", fast_configuration());
    let a = Node::start(&network, "mock://a", fast_configuration());
    let p = Node::start(&network, "mock://p", fast_configuration());
    let c = Node::start(&network, "mock://c", fast_configuration());

    // 1. F is full with S and A. C is the only child of P, the root of another tree.
    f.create_new_tree();
    s.add_neighbor(f.url()).unwrap();
    a.add_neighbor(f.url()).unwrap();
    p.create_new_tree();
    c.add_neighbor(p.url()).unwrap();
    wait_until("F has two broker neighbors", || f.number_of_brokers() == 2);

    // 2. C hears about F through gossip.
    let mut raw = RawPeer::new(&network, "mock://raw");
    let peer = raw.open(c.url());
    raw.send(
        &peer,
        PeriodicUpdate {
            candidates: vec![f.local_node()],
        },
    );
    raw.close(&peer);
    wait_until("C caches F", || c.global_candidates().contains(&f.local_node()));

    // 3. Crash P. F turns C away for lack of room, and C settles beneath one of F's children.
    let p_url = p.url().to_string();
    drop(p);
    network.kill(&p_url);

    wait_until("C attaches beneath S or A", || {
        let father = c.father();
        father == Some(s.local_node()) || father == Some(a.local_node())
    });
    assert_eq!(c.color(), f.color());
    assert_eq!(f.number_of_brokers(), 2);
}

#[test]
fn create_new_tree_leaves_the_father_test() {
    setup_logger(LevelFilter::Debug);
    let network = MockNetwork::new();
    let f = Node::start(&network, "mock://f", fast_configuration());
    let c = Node::start(&network, "mock://c", fast_configuration());
    f.create_new_tree();
    c.add_neighbor(f.url()).unwrap();
    wait_until("F has one broker neighbor", || f.number_of_brokers() == 1);

    // 1. C founds a tree of its own.
    c.create_new_tree();
    assert!(c.father().is_none());
    assert_eq!(c.color().len(), 2);

    // 2. F stops counting C as a child. The two trees may merge again later, with F beneath C.
    wait_until("F no longer has C as a child", || {
        f.number_of_brokers() == 0 || f.father() == Some(c.local_node())
    });
}
