//! Inputs delivered to a node.

use crate::TimerId;
use gossipsim_messages::Payload;
use gossipsim_types::{Content, NodeAddress};

/// Everything a node can be asked to handle.
///
/// Simulation-level events (node creation and destruction) never reach a
/// node; the clock handles those itself.
#[derive(Debug, Clone)]
pub enum NodeInput {
    /// A timer set via [`crate::Action::SetTimer`] fired.
    Timer(TimerId),

    /// A payload arrived over the channel.
    PayloadReceived {
        /// Channel address of the sender, for replies.
        from: NodeAddress,
        payload: Payload,
    },

    /// The local user authored new content.
    Author { content: Content },
}

impl NodeInput {
    /// Get a human-readable name for this input type.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeInput::Timer(TimerId::Gossip) => "GossipTimer",
            NodeInput::Timer(TimerId::Heartbeat) => "HeartbeatTimer",
            NodeInput::PayloadReceived { .. } => "PayloadReceived",
            NodeInput::Author { .. } => "Author",
        }
    }
}
