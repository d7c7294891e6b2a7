/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A cancellable periodic task: a thread that runs a closure every fixed interval until the closure
//! asks it to stop or its shutdown signal arrives.

use std::{
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

/// What a tick asks of the [`Ticker`] that ran it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    Stop,
}

pub(crate) struct Ticker {
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a thread that calls `tick` after every `interval`. The first call happens one interval
    /// after the ticker starts.
    pub(crate) fn start<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> TickOutcome + Send + 'static,
    {
        let (shutdown, shutdown_signal) = mpsc::channel();
        let thread = thread::spawn(move || loop {
            match shutdown_signal.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {
                    if tick() == TickOutcome::Stop {
                        return;
                    }
                }
            }
        });

        Self {
            shutdown,
            thread: Some(thread),
        }
    }

    /// Signal the thread to exit after its current tick, without waiting for it.
    pub(crate) fn cancel(&self) {
        let _ = self.shutdown.send(());
    }

    /// Signal the thread to exit and wait for it, unless called from the ticker thread itself.
    pub(crate) fn stop(mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel()
    }
}
