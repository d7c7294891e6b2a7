/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Tunable parameters of a [topology manager](crate::manager::TopologyManager).
//!
//! Every parameter has a default, so the smallest valid configuration is:
//!
//! ```
//! use lstree::config::Configuration;
//!
//! let configuration = Configuration::builder().build();
//! assert_eq!(configuration.max_degree, 4);
//! ```
//!
//! Any subset of the defaults can be overridden through the builder, for example:
//!
//! ```
//! use std::time::Duration;
//! use lstree::config::Configuration;
//!
//! let configuration = Configuration::builder()
//!     .max_degree(2)
//!     .response_timeout(Duration::from_secs(3))
//!     .cache_try_order("regional, busy, global".parse().unwrap())
//!     .log_events(false)
//!     .build();
//! ```
//!
//! Configurations are plain values, so any number of managers with different configurations can run in
//! the same process.

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::caches::CacheOrder;

/// Stores the parameters of a topology manager.
///
/// ## Degrees
///
/// Degrees count broker neighbors only, father included. A node that has reached `max_degree` refuses
/// new children unless they force it; a node that has not reached `min_degree` refuses them unless
/// they force it, and sends them towards its ancestors instead. A `min_degree` of `0` disables the
/// second check.
///
/// ## Log events
///
/// Protocol events are logged through the [log](https://docs.rs/log/latest/log/) crate, in the format
/// described in [`crate::logging`]. Diagnostic messages at the `debug` and `warn` levels are emitted
/// regardless of `log_events`.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. Every setter is optional:
    - `.global_cache_max_size(...)`
    - `.gossip_payload_fraction(...)`
    - `.gossip_recipient_fraction(...)`
    - `.upstream_max_length(...)`
    - `.max_degree(...)`
    - `.min_degree(...)`
    - `.busy_retry_delay(...)`
    - `.periodic_update_interval(...)`
    - `.root_connector_interval(...)`
    - `.response_timeout(...)`
    - `.update_hop_to_live(...)`
    - `.cache_try_order(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(default = 32, setter(doc = "Set the bound of the global candidate pool. Defaults to 32."))]
    pub global_cache_max_size: usize,

    #[builder(
        default = 0.5,
        setter(doc = "Set the fraction of the global cache gossiped per round. Defaults to 0.5.")
    )]
    pub gossip_payload_fraction: f64,

    #[builder(
        default = 0.25,
        setter(doc = "Set the fraction of the global cache gossiped to per round. Defaults to 0.25.")
    )]
    pub gossip_recipient_fraction: f64,

    #[builder(default = 4, setter(doc = "Set the bound of the upstream chain. Defaults to 4."))]
    pub upstream_max_length: usize,

    #[builder(default = 4, setter(doc = "Set the maximum broker degree. Defaults to 4."))]
    pub max_degree: usize,

    #[builder(default = 0, setter(doc = "Set the minimum broker degree. Defaults to 0."))]
    pub min_degree: usize,

    #[builder(
        default = Duration::from_millis(500),
        setter(doc = "Set the bound of the pause before retrying a busy candidate. Defaults to 500ms.")
    )]
    pub busy_retry_delay: Duration,

    #[builder(
        default = Duration::from_secs(10),
        setter(doc = "Set the interval between two gossip rounds. Defaults to 10s.")
    )]
    pub periodic_update_interval: Duration,

    #[builder(
        default = Duration::from_secs(5),
        setter(doc = "Set the interval between two attempts of a root to merge with another tree. Defaults to 5s.")
    )]
    pub root_connector_interval: Duration,

    #[builder(
        default = Duration::from_secs(10),
        setter(doc = "Set how long a negotiation waits for the candidate's response. Defaults to 10s.")
    )]
    pub response_timeout: Duration,

    #[builder(
        default,
        setter(
            strip_option,
            doc = "Set how many levels an UPDATE travels when nothing changes on the way. Defaults to the upstream chain bound."
        )
    )]
    pub update_hop_to_live: Option<u32>,

    #[builder(
        default,
        setter(doc = "Set the order in which a search consults its candidate pools. Defaults to regional, upstream, downstream, min-degree, busy, global, max-degree.")
    )]
    pub cache_try_order: CacheOrder,

    #[builder(default = true, setter(doc = "Enable protocol event logging? Defaults to true."))]
    pub log_events: bool,
}

impl Configuration {
    /// The hop-to-live of the UPDATEs this node originates.
    pub fn hop_to_live(&self) -> u32 {
        self.update_hop_to_live
            .unwrap_or(self.upstream_max_length as u32)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}
