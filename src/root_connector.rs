/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Background merge attempts of a root.
//!
//! While the local node is the root of its tree, it periodically searches its candidate pools for a
//! node of a dominating tree to attach beneath. Unlike a repair, a failed merge attempt leaves the
//! local tree as it is. The connector exits for good once the local node has a father, whichever way
//! it got one.

use std::{
    sync::Weak,
    time::Duration,
};

use crate::{
    manager::protocol::Core,
    networking::Transport,
    ticker::{TickOutcome, Ticker},
};

pub(crate) fn start<T: Transport>(core: Weak<Core<T>>, interval: Duration) -> Ticker {
    Ticker::start(interval, move || {
        let Some(core) = core.upgrade() else {
            return TickOutcome::Stop;
        };
        if core.is_stopped() || core.father().is_some() {
            return TickOutcome::Stop;
        }

        match core.search_father(None, true) {
            Some(father) => {
                log::debug!("Root merged beneath {}", father);
                TickOutcome::Stop
            }
            None => TickOutcome::Continue,
        }
    })
}
