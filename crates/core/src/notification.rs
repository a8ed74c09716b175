//! Telemetry notifications.
//!
//! Notifications are fire-and-forget: the clock hands them to every
//! registered [`TelemetrySink`] and never looks at what the sinks do. Display
//! and statistics layers subscribe here.

use gossipsim_messages::PayloadKind;
use gossipsim_types::{Content, Identity, NodeAddress, SimTime};
use std::cell::RefCell;
use std::rc::Rc;

/// Why a delivery did not reach its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    /// Random message loss.
    Loss,
    /// Overlapping transmission or reception windows at the receiver.
    Collision,
    /// The destination node no longer exists.
    Unreachable,
}

impl DropReason {
    pub fn name(&self) -> &'static str {
        match self {
            DropReason::Loss => "loss",
            DropReason::Collision => "collision",
            DropReason::Unreachable => "unreachable",
        }
    }
}

/// Which two windows overlapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollisionKind {
    /// A send attempt while the node was still transmitting. Deferred.
    SendWhileSending,
    /// A send attempt that would overlap an incoming reception. Deferred.
    SendWhileReceiving,
    /// A reception overlapping the receiver's own transmission. Dropped.
    ReceiveWhileSending,
    /// Two receptions overlapping at the same node. Both dropped.
    OverlappingReceptions,
}

impl CollisionKind {
    pub fn name(&self) -> &'static str {
        match self {
            CollisionKind::SendWhileSending => "send_while_sending",
            CollisionKind::SendWhileReceiving => "send_while_receiving",
            CollisionKind::ReceiveWhileSending => "receive_while_sending",
            CollisionKind::OverlappingReceptions => "overlapping_receptions",
        }
    }

    /// Send-side collisions defer; receive-side collisions drop.
    pub fn is_send_side(&self) -> bool {
        matches!(
            self,
            CollisionKind::SendWhileSending | CollisionKind::SendWhileReceiving
        )
    }
}

/// Relationship changes authored by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipKind {
    Follow,
    Unfollow,
    Block,
    Unblock,
}

impl RelationshipKind {
    /// Classify event content. `Post` is not a relationship.
    pub fn of(content: &Content) -> Option<(Self, Identity)> {
        match content {
            Content::Post(_) => None,
            Content::Follow(target) => Some((RelationshipKind::Follow, *target)),
            Content::Unfollow(target) => Some((RelationshipKind::Unfollow, *target)),
            Content::Block(target) => Some((RelationshipKind::Block, *target)),
            Content::Unblock(target) => Some((RelationshipKind::Unblock, *target)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RelationshipKind::Follow => "follow",
            RelationshipKind::Unfollow => "unfollow",
            RelationshipKind::Block => "block",
            RelationshipKind::Unblock => "unblock",
        }
    }
}

/// Something observable happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A payload reached a live destination.
    Delivered {
        from: NodeAddress,
        to: NodeAddress,
        kind: PayloadKind,
        sent_at: SimTime,
        /// Seconds from the send intent to reception.
        latency: f64,
    },

    /// A payload was not received.
    Dropped {
        from: NodeAddress,
        to: NodeAddress,
        kind: PayloadKind,
        reason: DropReason,
    },

    /// Two windows overlapped at `node`.
    Collision {
        node: NodeAddress,
        kind: CollisionKind,
    },

    /// A node authored a relationship event.
    Relationship {
        author: Identity,
        target: Identity,
        kind: RelationshipKind,
    },

    /// A node merged remote events into one of its logs.
    NewsAccepted {
        node: Identity,
        author: Identity,
        count: usize,
    },

    /// A node refused a run of remote events.
    NewsRejected {
        node: Identity,
        author: Identity,
        reason: String,
    },

    /// A node joined the simulation.
    NodeCreated {
        address: NodeAddress,
        identity: Identity,
    },

    /// A node left the simulation.
    NodeKilled {
        address: NodeAddress,
        identity: Identity,
    },
}

impl Notification {
    /// Get a human-readable name for this notification type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Notification::Delivered { .. } => "Delivered",
            Notification::Dropped { .. } => "Dropped",
            Notification::Collision { .. } => "Collision",
            Notification::Relationship { .. } => "Relationship",
            Notification::NewsAccepted { .. } => "NewsAccepted",
            Notification::NewsRejected { .. } => "NewsRejected",
            Notification::NodeCreated { .. } => "NodeCreated",
            Notification::NodeKilled { .. } => "NodeKilled",
        }
    }
}

/// Subscriber for notifications.
pub trait TelemetrySink {
    fn on_notification(&mut self, time: SimTime, notification: &Notification);
}

/// Shared sink, so the owner can read it back after handing a clone to the clock.
impl<T: TelemetrySink> TelemetrySink for Rc<RefCell<T>> {
    fn on_notification(&mut self, time: SimTime, notification: &Notification) {
        self.borrow_mut().on_notification(time, notification);
    }
}

/// Sink that keeps every notification, mainly for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub notifications: Vec<(SimTime, Notification)>,
}

impl TelemetrySink for RecordingSink {
    fn on_notification(&mut self, time: SimTime, notification: &Notification) {
        self.notifications.push((time, notification.clone()));
    }
}
