/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are shared by every component of the tree protocol: peer identities, and the two
//! coordinates ([`Color`] and [`Depth`]) that every node uses to keep the overlay acyclic.

pub mod color;

pub mod depth;

pub mod node;

pub use color::Color;
pub use depth::Depth;
pub use node::{NodeDescriptor, NodeId};
