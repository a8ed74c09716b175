//! Simulation events.

use crate::ProcessKind;
use gossipsim_core::{DropReason, TimerId};
use gossipsim_messages::Payload;
use gossipsim_types::{Content, NodeAddress, SimTime};

/// Where a pending send goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Unicast(NodeAddress),
    /// Every live node within broadcast range.
    Broadcast,
}

/// A send waiting for the channel to be free.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub target: Target,
    pub payload: Payload,
    /// When the node asked to send; latency is measured from here.
    pub requested_at: SimTime,
}

/// A payload in flight between two nodes.
#[derive(Debug, Clone)]
pub struct Wave {
    pub source: NodeAddress,
    pub destination: NodeAddress,
    /// Unique per run; all receptions of one broadcast share it.
    pub reference: u64,
    pub payload: Payload,
    /// Send intent time.
    pub sent_at: SimTime,
    /// End of the reception window at the destination.
    pub arrival: SimTime,
    /// Resolved delivery outcome.
    pub received: bool,
    /// First reason the wave was marked not received.
    pub drop_reason: Option<DropReason>,
}

impl Wave {
    /// Mark as not received. The first reason sticks.
    pub fn mark_dropped(&mut self, reason: DropReason) {
        self.received = false;
        self.drop_reason.get_or_insert(reason);
    }

    /// Seconds from send intent to arrival.
    pub fn latency(&self) -> f64 {
        self.arrival.since(self.sent_at)
    }
}

/// Everything the clock can dispatch.
///
/// Node creation and destruction are simulation-level; every other variant
/// targets one node.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// Add a node. `initial` nodes stagger their first gossip round.
    CreateNode { initial: bool },

    /// Remove a node (a random one when `target` is `None`).
    KillNode { target: Option<NodeAddress> },

    /// A random user action; node and target are drawn at dispatch.
    RandomAction(ProcessKind),

    /// Explicit user action at a given node.
    Author { node: NodeAddress, content: Content },

    /// A node timer fired.
    Timer { node: NodeAddress, id: TimerId },

    /// A node tries to put a payload on the channel.
    Transmit { from: NodeAddress, send: PendingSend },

    /// A reception completes at the destination.
    Deliver(Box<Wave>),
}

impl SimEvent {
    /// Short name for traces and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SimEvent::CreateNode { .. } => "CreateNode",
            SimEvent::KillNode { .. } => "KillNode",
            SimEvent::RandomAction(kind) => kind.name(),
            SimEvent::Author { .. } => "Author",
            SimEvent::Timer {
                id: TimerId::Gossip,
                ..
            } => "GossipTimer",
            SimEvent::Timer {
                id: TimerId::Heartbeat,
                ..
            } => "HeartbeatTimer",
            SimEvent::Transmit { .. } => "Transmit",
            SimEvent::Deliver(_) => "Deliver",
        }
    }

    /// The node this event is addressed to, if known before dispatch.
    pub fn destination(&self) -> Option<NodeAddress> {
        match self {
            SimEvent::CreateNode { .. } | SimEvent::RandomAction(_) => None,
            SimEvent::KillNode { target } => *target,
            SimEvent::Author { node, .. } | SimEvent::Timer { node, .. } => Some(*node),
            SimEvent::Transmit { from, .. } => Some(*from),
            SimEvent::Deliver(wave) => Some(wave.destination),
        }
    }
}
