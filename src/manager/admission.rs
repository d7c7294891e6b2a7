/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Server side of the tree protocol: deciding whether to accept a requester as a child.
//!
//! A [`Request`] is examined under the state lock, against the following checks in order. The first
//! check that applies decides the response.
//!
//! 1. The requester is already a neighbor: the request is a duplicate and is ignored.
//! 2. The requester's color and depth do not allow it beneath the local node: `NOT_DEPTH_OR_COLOR`.
//! 3. The local node is reconfiguring itself and the requester does not dominate it: `BUSY`.
//! 4. The local node has reached its maximum degree and the requester did not force it:
//!    `NOT_MAX_DEGREE`, with the local node's children as alternatives.
//! 5. The local node has not reached its minimum degree and the requester did not force it:
//!    `NOT_MIN_DEGREE`, with the local node's upstream chain as alternatives.
//! 6. Otherwise: `CONNECTION_ACCEPTED`.
//!
//! ## Ordering
//!
//! The requester may attach beneath the local node if:
//! 1. The local node is a colorless root and the requester is colored. The local node then adopts the
//!    requester's color, or
//! 2. They have the same color, and the local depth is (or can be moved) strictly between the depth
//!    of the local node's father and the requester's depth, or
//! 3. They have different colors and the requester's color [can connect
//!    to](crate::types::Color::can_connect_to) the local node's color.

use rand::Rng;

use crate::{
    messages::{
        Busy, ConnectionAccepted, GoodCandidate, Message, NewSibling, NotDepthOrColor, NotMaxDegree,
        NotMinDegree, Request, Response, Update,
    },
    networking::{sending::SenderHandle, Transport},
    types::{Color, Depth, NodeDescriptor},
};

use super::{protocol::Core, state::TreeState};

/// What admission would change about the local node if it accepted.
enum Admission {
    /// Take `color` and `depth`.
    Adopt(Color, Depth),
    /// Keep the color, take `depth`.
    Move(Depth),
    /// Keep both.
    Keep,
}

impl<T: Transport> Core<T> {
    /// Answer a [`Request`] from `requester`.
    pub(crate) fn examine_request(&self, requester: NodeDescriptor, request: Request) {
        let mut rng = rand::thread_rng();
        let mut sender = self.sender();
        let mut state = self.state.lock().unwrap();

        if state.neighbors.contains(&requester) {
            log::debug!("Ignoring duplicate request from {}", requester);
            return;
        }

        let Some(admission) = admit(&state, &request, &mut rng) else {
            let local_root = state.local_root(&self.local);
            let (good_candidate, hint) = if state.color.can_connect_to(&request.color) {
                // The local tree may attach beneath the requester's: tell the local root about it.
                if local_root == self.local {
                    state.global.set_good_candidate(requester.clone());
                    (None, None)
                } else {
                    (None, Some(local_root))
                }
            } else if local_root != self.local {
                (Some(local_root), None)
            } else {
                (None, None)
            };

            self.reject(
                &mut sender,
                &requester,
                NotDepthOrColor {
                    color: state.color.clone(),
                    depth: state.depth,
                    good_candidate,
                },
            );
            drop(state);

            if let Some(root) = hint {
                self.send_transient(
                    &root,
                    GoodCandidate {
                        candidate: requester,
                    }
                    .into(),
                );
            }
            return;
        };

        let degree = state.neighbors.number_of_brokers();
        let rejection: Option<Response> =
            if self.slot.is_busy() && !state.color.can_connect_to(&request.color) {
                Some(
                    Busy {
                        color: state.color.clone(),
                        depth: state.depth,
                    }
                    .into(),
                )
            } else if degree >= self.configuration.max_degree && !request.force_max_degree {
                Some(
                    NotMaxDegree {
                        color: state.color.clone(),
                        depth: state.depth,
                        siblings: state.children(),
                    }
                    .into(),
                )
            } else if degree < self.configuration.min_degree && !request.force_min_degree {
                Some(
                    NotMinDegree {
                        color: state.color.clone(),
                        depth: state.depth,
                        upstream: state.chain_for_children(self.configuration.upstream_max_length),
                    }
                    .into(),
                )
            } else {
                None
            };

        if let Some(rejection) = rejection {
            self.reject(&mut sender, &requester, rejection);
            return;
        }

        self.accept(&mut sender, &mut state, requester, admission);
    }

    fn reject(
        &self,
        sender: &mut SenderHandle<T>,
        requester: &NodeDescriptor,
        rejection: impl Into<Response>,
    ) {
        let rejection = rejection.into();
        if let Some(kind) = rejection.rejection_kind() {
            self.events.reject_child(&requester.id(), kind);
        }
        if let Err(err) = sender.send(requester, rejection) {
            log::debug!("Could not answer {}: {}", requester, err);
        }
    }

    fn accept(
        &self,
        sender: &mut SenderHandle<T>,
        state: &mut TreeState,
        child: NodeDescriptor,
        admission: Admission,
    ) {
        let previous = (state.color.clone(), state.depth);
        let color_changed = match admission {
            Admission::Adopt(color, depth) => {
                state.color = color;
                state.depth = depth;
                true
            }
            Admission::Move(depth) => {
                state.depth = depth;
                false
            }
            Admission::Keep => false,
        };

        let children = state.children();
        let upstream = state.chain_for_children(self.configuration.upstream_max_length);
        let accepted = ConnectionAccepted {
            color: state.color.clone(),
            depth: state.depth,
            upstream: upstream.clone(),
            siblings: children.clone(),
        };

        if let Err(err) = sender.send(&child, accepted) {
            log::debug!("Could not accept {}: {}", child, err);
            (state.color, state.depth) = previous;
            return;
        }

        // Hold a reference to the link for as long as the child is a neighbor.
        if let Some(url) = child.primary_url() {
            if let Err(err) = sender.safe_open(url) {
                log::debug!("Could not retain the link to {}: {}", child, err);
            }
        }
        state.neighbors.confirm(child.clone());
        self.events.accept_child(&child.id(), &state.color, state.depth);

        let new_sibling: Message = NewSibling {
            color: state.color.clone(),
            depth: state.depth,
            upstream: upstream.clone(),
            siblings: children.clone(),
            global_cache: state.global.snapshot(),
            sibling: child,
        }
        .into();
        sender.send_to_all(&children, new_sibling);

        if color_changed {
            let update = Update {
                color: state.color.clone(),
                depth: state.depth,
                upstream,
                hop_to_live: self.configuration.hop_to_live(),
            };
            sender.send_to_all(&children, update);
        }
    }
}

/// Whether `request` passes the ordering test, and if so, what accepting it would change locally.
fn admit(state: &TreeState, request: &Request, rng: &mut impl Rng) -> Option<Admission> {
    if state.is_root() && state.color.is_colorless() && !request.color.is_colorless() {
        let mut depth = state.depth;
        depth.make_less_than(request.depth, None, rng);
        return Some(Admission::Adopt(request.color.clone(), depth));
    }

    if state.color == request.color {
        if state.depth < request.depth
            && state.father_depth.map_or(true, |floor| floor < state.depth)
        {
            return Some(Admission::Keep);
        }
        let mut depth = state.depth;
        return depth
            .make_less_than(request.depth, state.father_depth, rng)
            .then_some(Admission::Move(depth));
    }

    request
        .color
        .can_connect_to(&state.color)
        .then_some(Admission::Keep)
}

#[cfg(test)]
mod tests {
    use crate::{config::Configuration, messages::RejectionKind};

    use super::*;

    fn request(color: &Color, depth: f64) -> Request {
        Request {
            color: color.clone(),
            depth: Depth::new(depth),
            force_max_degree: false,
            force_min_degree: false,
        }
    }

    fn state(color: &Color, depth: f64) -> TreeState {
        let mut state = TreeState::new(&Configuration::default(), &mut rand::thread_rng());
        state.color = color.clone();
        state.depth = Depth::new(depth);
        state
    }

    #[test]
    fn colorless_root_yields_to_colored_requester() {
        let mut rng = rand::thread_rng();
        let colored = Color::new(vec!["mock://a".into()]);
        let state = state(&Color::colorless(), 5.0);

        match admit(&state, &request(&colored, 1.0), &mut rng) {
            Some(Admission::Adopt(color, depth)) => {
                assert_eq!(color, colored);
                assert!(depth < Depth::new(1.0));
            }
            _ => panic!("expected the colorless root to adopt the requester's color"),
        }
    }

    #[test]
    fn same_color_requires_room_above_the_requester() {
        let mut rng = rand::thread_rng();
        let color = Color::new(vec!["mock://a".into()]);

        let shallow = state(&color, 1.0);
        assert!(matches!(
            admit(&shallow, &request(&color, 2.0), &mut rng),
            Some(Admission::Keep)
        ));

        let mut deep = state(&color, 3.0);
        deep.father = Some(NodeDescriptor::new(vec!["mock://father".into()], true));
        deep.father_depth = Some(Depth::new(1.0));
        match admit(&deep, &request(&color, 2.0), &mut rng) {
            Some(Admission::Move(depth)) => assert!(Depth::new(1.0) < depth && depth < Depth::new(2.0)),
            _ => panic!("expected the local depth to move between father and requester"),
        }

        // The requester is above the local node's father: accepting it would close a cycle.
        assert!(admit(&deep, &request(&color, 0.5), &mut rng).is_none());
    }

    #[test]
    fn different_colors_follow_the_color_order() {
        let mut rng = rand::thread_rng();
        let short = Color::new(vec!["mock://a".into()]);
        let long = Color::new(vec!["mock://a".into(), "mock://b".into()]);

        // Shorter colors attach beneath longer ones.
        assert!(admit(&state(&long, 0.0), &request(&short, 9.0), &mut rng).is_some());
        assert!(admit(&state(&short, 0.0), &request(&long, 9.0), &mut rng).is_none());

        // Having a father does not change the order between colors.
        let mut attached = state(&long, 0.0);
        attached.father = Some(NodeDescriptor::new(vec!["mock://father".into()], true));
        assert!(admit(&attached, &request(&short, 9.0), &mut rng).is_some());
    }

    #[test]
    fn rejection_kinds_match_their_responses() {
        let response: Response = Busy {
            color: Color::colorless(),
            depth: Depth::new(0.0),
        }
        .into();
        assert_eq!(response.rejection_kind(), Some(RejectionKind::Busy));
    }
}
