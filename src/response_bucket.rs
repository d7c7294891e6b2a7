/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Single-slot mailbox that pairs an outstanding [`Request`](crate::messages::Request) with its
//! [`Response`].
//!
//! ## Usage
//!
//! A negotiation calls [`wait_from`](ResponseBucket::wait_from) immediately before sending its request,
//! then blocks in [`await_response`](ResponseBucket::await_response). The poller thread hands every
//! inbound response to [`deliver`](ResponseBucket::deliver), and every link failure to
//! [`cancel`](ResponseBucket::cancel).
//!
//! At most one wait is outstanding at a time. The bucket does not enforce this itself: callers must hold
//! the [reconfiguration slot](crate::reconfiguration::ReconfigurationSlot) across the whole exchange.

use std::{
    fmt::{self, Display, Formatter},
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
        Mutex,
    },
    time::Duration,
};

use crate::{messages::Response, types::NodeDescriptor};

pub(crate) struct ResponseBucket {
    timeout: Duration,
    state: Mutex<BucketState>,
}

#[derive(Default)]
struct BucketState {
    /// The node whose response will be accepted. Cleared by delivery and cancellation.
    awaited: Option<NodeDescriptor>,
    /// The node the current wait was declared for. Cleared only when the waiter returns.
    target: Option<NodeDescriptor>,
    sender: Option<SyncSender<Response>>,
    receiver: Option<Receiver<Response>>,
}

impl ResponseBucket {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: Mutex::new(BucketState::default()),
        }
    }

    /// Declare `peer` as the only node whose response will be accepted, discarding any previous wait.
    pub(crate) fn wait_from(&self, peer: NodeDescriptor) {
        let (sender, receiver) = mpsc::sync_channel(1);
        let mut state = self.state.lock().unwrap();
        state.awaited = Some(peer.clone());
        state.target = Some(peer);
        state.sender = Some(sender);
        state.receiver = Some(receiver);
    }

    /// Hand `response` from `origin` to the waiter.
    ///
    /// Fails with [`ResponseBucketError::ProtocolViolation`] if `origin` is not the awaited node, and with
    /// [`ResponseBucketError::NotWaiting`] if nothing is awaited at all. In both cases `response` is
    /// dropped.
    pub(crate) fn deliver(
        &self,
        origin: &NodeDescriptor,
        response: Response,
    ) -> Result<(), ResponseBucketError> {
        let mut state = self.state.lock().unwrap();
        match &state.awaited {
            None => Err(ResponseBucketError::NotWaiting),
            Some(awaited) if awaited != origin => Err(ResponseBucketError::ProtocolViolation {
                expected: awaited.clone(),
                origin: origin.clone(),
            }),
            Some(_) => {
                state.awaited = None;
                match state.sender.take() {
                    // The channel has room for exactly one response, and this is the only send.
                    Some(sender) => {
                        let _ = sender.try_send(response);
                        Ok(())
                    }
                    None => Err(ResponseBucketError::NotWaiting),
                }
            }
        }
    }

    /// Wake the waiter without a response if it is waiting for `peer`. Returns whether it was.
    pub(crate) fn cancel(&self, peer: &NodeDescriptor) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.awaited.as_ref() == Some(peer) {
            state.awaited = None;
            state.sender = None;
            true
        } else {
            false
        }
    }

    /// Block until the awaited response is delivered, the wait is cancelled, or the timeout elapses.
    ///
    /// Whatever the outcome, the bucket is idle again when this returns.
    pub(crate) fn await_response(&self) -> Result<Response, ResponseBucketError> {
        let receiver = self
            .state
            .lock()
            .unwrap()
            .receiver
            .take()
            .ok_or(ResponseBucketError::NotWaiting)?;

        let received = receiver.recv_timeout(self.timeout);

        let mut state = self.state.lock().unwrap();
        // `deliver` sends while holding the state lock, so a delivery that was acknowledged before the
        // deadline check is already in the channel.
        let received = received.or_else(|_| receiver.try_recv().map_err(|_| RecvTimeoutError::Timeout));
        let target = std::mem::take(&mut *state).target;
        drop(state);

        match (received, target) {
            (Ok(response), _) => Ok(response),
            (Err(_), Some(peer)) => Err(ResponseBucketError::PeerUnreachable(peer)),
            (Err(_), None) => Err(ResponseBucketError::NotWaiting),
        }
    }

    /// Whether some node's response is currently awaited.
    #[cfg(test)]
    pub(crate) fn is_waiting(&self) -> bool {
        self.state.lock().unwrap().awaited.is_some()
    }
}

/// The ways handing over a response can fail.
#[derive(Clone, Debug)]
pub enum ResponseBucketError {
    /// A response arrived from a node other than the one awaited.
    ProtocolViolation {
        expected: NodeDescriptor,
        origin: NodeDescriptor,
    },

    /// The awaited node did not answer in time, or its link went away.
    PeerUnreachable(NodeDescriptor),

    /// A response arrived, or a wait was attempted, while nothing was awaited.
    NotWaiting,
}

impl Display for ResponseBucketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBucketError::ProtocolViolation { expected, origin } => write!(
                f,
                "response from {} while waiting for {}",
                origin, expected
            ),
            ResponseBucketError::PeerUnreachable(peer) => write!(f, "{} is unreachable", peer),
            ResponseBucketError::NotWaiting => f.write_str("not waiting for any response"),
        }
    }
}

impl std::error::Error for ResponseBucketError {}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Instant};

    use crate::{
        messages::Busy,
        types::{Color, Depth},
    };

    use super::*;

    fn node(url: &str) -> NodeDescriptor {
        NodeDescriptor::new(vec![url.to_string()], true)
    }

    fn busy() -> Response {
        Busy {
            color: Color::colorless(),
            depth: Depth::new(1.0),
        }
        .into()
    }

    #[test]
    fn delivers_to_a_blocked_waiter() {
        let bucket = Arc::new(ResponseBucket::new(Duration::from_secs(5)));
        let peer = node("mock://peer");
        bucket.wait_from(peer.clone());

        let deliverer = {
            let bucket = bucket.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                bucket.deliver(&peer, busy())
            })
        };

        let response = bucket.await_response().unwrap();
        assert!(matches!(response, Response::Busy(_)));
        assert!(deliverer.join().unwrap().is_ok());
        assert!(!bucket.is_waiting());
    }

    #[test]
    fn rejects_responses_from_other_nodes() {
        let bucket = ResponseBucket::new(Duration::from_millis(50));
        let (awaited, stranger) = (node("mock://awaited"), node("mock://stranger"));
        bucket.wait_from(awaited.clone());

        assert!(matches!(
            bucket.deliver(&stranger, busy()),
            Err(ResponseBucketError::ProtocolViolation { expected, origin })
                if expected == awaited && origin == stranger
        ));
        assert!(bucket.is_waiting());
    }

    #[test]
    fn times_out_and_leaves_no_residual_wait() {
        let bucket = ResponseBucket::new(Duration::from_millis(100));
        let peer = node("mock://silent");
        bucket.wait_from(peer.clone());

        let started = Instant::now();
        assert!(matches!(
            bucket.await_response(),
            Err(ResponseBucketError::PeerUnreachable(unreachable)) if unreachable == peer
        ));
        assert!(started.elapsed() >= Duration::from_millis(100));

        assert!(matches!(
            bucket.deliver(&peer, busy()),
            Err(ResponseBucketError::NotWaiting)
        ));
    }

    #[test]
    fn deliveries_at_the_deadline_are_never_lost() {
        let peer = node("mock://late");
        for attempt in 0..2000u32 {
            let bucket = Arc::new(ResponseBucket::new(Duration::from_millis(1)));
            bucket.wait_from(peer.clone());

            let deliverer = {
                let (bucket, peer) = (bucket.clone(), peer.clone());
                thread::spawn(move || {
                    thread::sleep(Duration::from_micros(900 + u64::from(attempt % 250)));
                    bucket.deliver(&peer, busy())
                })
            };

            let awaited = bucket.await_response();
            let delivered = deliverer.join().unwrap();
            assert_eq!(
                delivered.is_ok(),
                awaited.is_ok(),
                "attempt {}: deliver returned {:?}, the waiter got {:?}",
                attempt,
                delivered,
                awaited
            );
        }
    }

    #[test]
    fn cancel_wakes_the_waiter_early() {
        let bucket = Arc::new(ResponseBucket::new(Duration::from_secs(10)));
        let peer = node("mock://dying");
        bucket.wait_from(peer.clone());

        let canceller = {
            let bucket = bucket.clone();
            let peer = peer.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                bucket.cancel(&peer)
            })
        };

        let started = Instant::now();
        assert!(matches!(
            bucket.await_response(),
            Err(ResponseBucketError::PeerUnreachable(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(canceller.join().unwrap());
    }

    #[test]
    fn cancel_ignores_other_nodes() {
        let bucket = ResponseBucket::new(Duration::from_millis(50));
        bucket.wait_from(node("mock://a"));
        assert!(!bucket.cancel(&node("mock://b")));
        assert!(bucket.is_waiting());
    }
}
