/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Background gossip of the global cache.
//!
//! Every round, a random fraction of the global cache is sent to another random fraction of it, over
//! short-lived links, so that candidates learnt by one tree spread to the others.

use std::{sync::Arc, time::Duration};

use crate::{
    manager::protocol::Core,
    messages::PeriodicUpdate,
    networking::{sending::SenderHandle, TrafficClass, Transport},
    ticker::{TickOutcome, Ticker},
    types::NodeDescriptor,
};

pub(crate) fn start<T: Transport>(core: Arc<Core<T>>, interval: Duration) -> Ticker {
    Ticker::start(interval, move || {
        if core.is_stopped() {
            return TickOutcome::Stop;
        }
        core.gossip();
        TickOutcome::Continue
    })
}

/// Send `payload` to each of `recipients`, over a link opened for the occasion.
pub(crate) fn send_round<T: Transport>(
    sender: &mut SenderHandle<T>,
    payload: Vec<NodeDescriptor>,
    recipients: &[NodeDescriptor],
) {
    for recipient in recipients {
        sender.send_transient(
            recipient,
            PeriodicUpdate {
                candidates: payload.clone(),
            },
            TrafficClass::Gossip,
        );
    }
}
