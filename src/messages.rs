/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Exhaustive enumeration of the messages exchanged between tree managers.
//!
//! Every message has a subject string (see [`Message::subject`]). Transports that dispatch on subjects
//! must register a listener for every constant defined in this module.
//!
//! The messages fall into three groups:
//! 1. The [`Request`] a node sends to a candidate father, and the [`Response`] it waits for.
//! 2. Maintenance messages a father sends to its children ([`Update`], [`NewSibling`],
//!    [`SiblingDead`]), and [`Message::NoLongerChild`], which either side uses to unwind an edge.
//! 3. Discovery messages that carry candidates between trees ([`PeriodicUpdate`], [`GoodCandidate`]).
//!
//! The sender of a message is never part of the payload: transports report it alongside the message
//! (see [`TransportEvent`](crate::networking::TransportEvent)).

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{Color, Depth, NodeDescriptor};

pub const REQUEST: &str = "REQUEST";
pub const CONNECTION_ACCEPTED: &str = "CONNECTION_ACCEPTED";
pub const NOT_DEPTH_OR_COLOR: &str = "NOT_DEPTH_OR_COLOR";
pub const NOT_MAX_DEGREE: &str = "NOT_MAX_DEGREE";
pub const NOT_MIN_DEGREE: &str = "NOT_MIN_DEGREE";
pub const BUSY: &str = "BUSY";
pub const SIBLING_DEAD: &str = "SIBLING_DEAD";
pub const UPDATE: &str = "UPDATE";
pub const NEW_SIBLING: &str = "NEW_SIBLING";
pub const PERIODIC_UPDATE: &str = "PERIODIC_UPDATE";
pub const GOOD_CANDIDATE: &str = "GOOD_CANDIDATE";
pub const NO_LONGER_CHILD: &str = "NOLONGERCHILD";

/// Every subject, in the order a transport should register its listeners.
pub const SUBJECTS: [&str; 12] = [
    REQUEST,
    CONNECTION_ACCEPTED,
    NOT_DEPTH_OR_COLOR,
    NOT_MAX_DEGREE,
    NOT_MIN_DEGREE,
    BUSY,
    SIBLING_DEAD,
    UPDATE,
    NEW_SIBLING,
    PERIODIC_UPDATE,
    GOOD_CANDIDATE,
    NO_LONGER_CHILD,
];

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
    SiblingDead(SiblingDead),
    Update(Update),
    NewSibling(NewSibling),
    PeriodicUpdate(PeriodicUpdate),
    GoodCandidate(GoodCandidate),
    NoLongerChild,
}

impl Message {
    pub fn subject(&self) -> &'static str {
        match self {
            Message::Request(_) => REQUEST,
            Message::Response(response) => response.subject(),
            Message::SiblingDead(_) => SIBLING_DEAD,
            Message::Update(_) => UPDATE,
            Message::NewSibling(_) => NEW_SIBLING,
            Message::PeriodicUpdate(_) => PERIODIC_UPDATE,
            Message::GoodCandidate(_) => GOOD_CANDIDATE,
            Message::NoLongerChild => NO_LONGER_CHILD,
        }
    }
}

/// Sent by a fatherless node to a candidate father.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct Request {
    pub color: Color,
    pub depth: Depth,
    /// Ask the candidate to accept even if it has reached its maximum degree.
    pub force_max_degree: bool,
    /// Ask the candidate to accept even if it has not reached its minimum degree.
    pub force_min_degree: bool,
}

impl From<Request> for Message {
    fn from(value: Request) -> Self {
        Message::Request(value)
    }
}

/// The answers to a [`Request`]. Exactly one is expected per request.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum Response {
    ConnectionAccepted(ConnectionAccepted),
    NotDepthOrColor(NotDepthOrColor),
    NotMaxDegree(NotMaxDegree),
    NotMinDegree(NotMinDegree),
    Busy(Busy),
}

impl Response {
    pub fn subject(&self) -> &'static str {
        match self {
            Response::ConnectionAccepted(_) => CONNECTION_ACCEPTED,
            Response::NotDepthOrColor(_) => NOT_DEPTH_OR_COLOR,
            Response::NotMaxDegree(_) => NOT_MAX_DEGREE,
            Response::NotMinDegree(_) => NOT_MIN_DEGREE,
            Response::Busy(_) => BUSY,
        }
    }

    /// Get the `color` field of the inner response.
    pub fn color(&self) -> &Color {
        match self {
            Response::ConnectionAccepted(msg) => &msg.color,
            Response::NotDepthOrColor(msg) => &msg.color,
            Response::NotMaxDegree(msg) => &msg.color,
            Response::NotMinDegree(msg) => &msg.color,
            Response::Busy(msg) => &msg.color,
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Response::ConnectionAccepted(_))
    }

    /// The reason for refusing the request, or `None` if the response accepts it.
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            Response::ConnectionAccepted(_) => None,
            Response::NotDepthOrColor(_) => Some(RejectionKind::NotDepthOrColor),
            Response::NotMaxDegree(_) => Some(RejectionKind::NotMaxDegree),
            Response::NotMinDegree(_) => Some(RejectionKind::NotMinDegree),
            Response::Busy(_) => Some(RejectionKind::Busy),
        }
    }
}

impl From<Response> for Message {
    fn from(value: Response) -> Self {
        Message::Response(value)
    }
}

/// Why a candidate father refused a [`Request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionKind {
    NotDepthOrColor,
    NotMaxDegree,
    NotMinDegree,
    Busy,
}

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct ConnectionAccepted {
    pub color: Color,
    pub depth: Depth,
    /// The father's own father followed by its further ancestors, closest first.
    pub upstream: Vec<NodeDescriptor>,
    /// The father's other children.
    pub siblings: Vec<NodeDescriptor>,
}

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct NotDepthOrColor {
    pub color: Color,
    pub depth: Depth,
    /// A node of a tree the requester may be able to join instead.
    pub good_candidate: Option<NodeDescriptor>,
}

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct NotMaxDegree {
    pub color: Color,
    pub depth: Depth,
    pub siblings: Vec<NodeDescriptor>,
}

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct NotMinDegree {
    pub color: Color,
    pub depth: Depth,
    pub upstream: Vec<NodeDescriptor>,
}

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct Busy {
    pub color: Color,
    pub depth: Depth,
}

macro_rules! into_response {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Response {
                fn from(value: $variant) -> Self {
                    Response::$variant(value)
                }
            }

            impl From<$variant> for Message {
                fn from(value: $variant) -> Self {
                    Message::Response(Response::$variant(value))
                }
            }
        )*
    };
}

into_response!(ConnectionAccepted, NotDepthOrColor, NotMaxDegree, NotMinDegree, Busy);

/// Sent by a father to its remaining children when one of their siblings disappears.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct SiblingDead {
    pub color: Color,
    pub depth: Depth,
    pub global_cache: Vec<NodeDescriptor>,
    pub dead: NodeDescriptor,
}

impl From<SiblingDead> for Message {
    fn from(value: SiblingDead) -> Self {
        Message::SiblingDead(value)
    }
}

/// Sent by a father to its children whenever its color, depth or upstream chain changes.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct Update {
    pub color: Color,
    pub depth: Depth,
    pub upstream: Vec<NodeDescriptor>,
    /// How many more levels this update should travel if nothing changes on the way.
    pub hop_to_live: u32,
}

impl From<Update> for Message {
    fn from(value: Update) -> Self {
        Message::Update(value)
    }
}

/// Sent by a father to its existing children after it accepts `sibling` as a new child.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct NewSibling {
    pub color: Color,
    pub depth: Depth,
    pub upstream: Vec<NodeDescriptor>,
    pub siblings: Vec<NodeDescriptor>,
    pub global_cache: Vec<NodeDescriptor>,
    pub sibling: NodeDescriptor,
}

impl From<NewSibling> for Message {
    fn from(value: NewSibling) -> Self {
        Message::NewSibling(value)
    }
}

/// Gossip of globally known candidates.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct PeriodicUpdate {
    pub candidates: Vec<NodeDescriptor>,
}

impl From<PeriodicUpdate> for Message {
    fn from(value: PeriodicUpdate) -> Self {
        Message::PeriodicUpdate(value)
    }
}

/// A single cross-tree hint, preferred over everything else in the global cache.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct GoodCandidate {
    pub candidate: NodeDescriptor,
}

impl From<GoodCandidate> for Message {
    fn from(value: GoodCandidate) -> Self {
        Message::GoodCandidate(value)
    }
}
