/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions for receiving events from the [`Transport`].

use std::{
    sync::mpsc::{Receiver, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use super::transport::{Transport, TransportEvent};

/// How long the poller sleeps when the transport has nothing to report.
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Spawn the poller thread, which polls the [`Transport`] for events and hands each of them to
/// `dispatch`, in the order the transport reported them.
///
/// `dispatch` runs on the poller thread, so it must not block for longer than it takes to update
/// local state and queue a few messages. Anything slower (e.g., searching for a new father) has to
/// be moved to another thread.
pub(crate) fn start_polling<T, F>(
    mut transport: T,
    shutdown_signal: Receiver<()>,
    mut dispatch: F,
) -> JoinHandle<()>
where
    T: Transport,
    F: FnMut(TransportEvent) + Send + 'static,
{
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        match transport.recv() {
            Some(event) => dispatch(event),
            None => thread::sleep(IDLE_BACKOFF),
        }
    })
}
