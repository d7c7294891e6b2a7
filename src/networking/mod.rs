/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable links to other brokers.
//!
//! The tree protocol never opens sockets itself. Everything it needs from the wire (opening, closing
//! and writing to links, and learning about messages and link failures) goes through the
//! [`Transport`] trait, which the library user implements on top of their own framing, queuing and
//! dead-link detection.

pub mod transport;

pub(crate) mod receiving;

pub(crate) mod sending;

pub use transport::{LinkError, SendError, TrafficClass, Transport, TransportEvent};
