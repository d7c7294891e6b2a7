/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A self-organizing overlay topology for content-based publish/subscribe broker networks.
//!
//! Independently started brokers arrange themselves into a spanning forest that keeps merging into
//! fewer, larger trees, without any central coordinator, and that heals itself when nodes or links
//! fail. Each broker runs a [`TopologyManager`](manager::TopologyManager) over a user-provided
//! [`Transport`](networking::Transport).
//!
//! ## Trees
//!
//! Every tree has a [`Color`](types::Color), and every node a real-valued [`Depth`](types::Depth) that
//! strictly increases from the root of its tree towards its leaves. A node only attaches beneath a
//! node whose color dominates its own, or beneath a shallower node of its own color, which keeps the
//! forest acyclic.
//!
//! ## Repair
//!
//! When its father goes away, a node searches the [candidate pools](caches) it has accumulated for a
//! new one. If the search comes up empty, the node becomes the root of a new tree, and from then on
//! periodically tries to merge it into another.

pub mod caches;

pub mod config;

pub mod logging;

pub mod manager;

pub mod messages;

pub mod networking;

pub(crate) mod neighbors;

pub(crate) mod periodic_updater;

pub(crate) mod reconfiguration;

pub mod response_bucket;

pub(crate) mod root_connector;

pub(crate) mod ticker;

pub mod types;
