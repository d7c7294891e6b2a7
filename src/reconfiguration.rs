/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The reconfiguration slot: at most one attempt to change the local node's father runs at a time.
//!
//! Both [`TopologyManager::add_neighbor`](crate::manager::TopologyManager::add_neighbor) and the
//! repair search block on [`acquire`](ReconfigurationSlot::acquire) and hold the returned
//! [`SlotGuard`] for the whole attempt. Admission reads [`is_busy`](ReconfigurationSlot::is_busy) to
//! turn requesters away while an attempt is in flight.

use std::sync::{Condvar, Mutex};

#[derive(Default)]
pub(crate) struct ReconfigurationSlot {
    busy: Mutex<bool>,
    released: Condvar,
}

impl ReconfigurationSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until the slot is free, then take it. The slot is released when the guard is dropped.
    pub(crate) fn acquire(&self) -> SlotGuard<'_> {
        let mut busy = self.busy.lock().unwrap();
        while *busy {
            busy = self.released.wait(busy).unwrap();
        }
        *busy = true;
        SlotGuard { slot: self }
    }

    pub(crate) fn is_busy(&self) -> bool {
        *self.busy.lock().unwrap()
    }

    fn release(&self) {
        *self.busy.lock().unwrap() = false;
        self.released.notify_one();
    }
}

/// Proof that the holder owns the [`ReconfigurationSlot`].
pub(crate) struct SlotGuard<'a> {
    slot: &'a ReconfigurationSlot,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.release()
    }
}
