//! Actions returned by node state machines.

use crate::{Notification, TimerId};
use gossipsim_messages::Payload;
use gossipsim_types::NodeAddress;

/// Something the clock must do on a node's behalf.
#[derive(Debug, Clone)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════
    /// Unicast to a known address.
    SendTo { to: NodeAddress, payload: Payload },

    /// Unicast to a live peer picked by the clock.
    SendToRandomPeer { payload: Payload },

    /// Send to every live node within broadcast range.
    Broadcast { payload: Payload },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Fire `id` after `delay` seconds.
    SetTimer { id: TimerId, delay: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // Telemetry
    // ═══════════════════════════════════════════════════════════════════════
    /// Forward to the telemetry sinks. Never affects simulation state.
    Notify(Notification),
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SendTo { .. } => "SendTo",
            Action::SendToRandomPeer { .. } => "SendToRandomPeer",
            Action::Broadcast { .. } => "Broadcast",
            Action::SetTimer { .. } => "SetTimer",
            Action::Notify(_) => "Notify",
        }
    }

    /// Whether this action puts a payload on the channel.
    pub fn is_send(&self) -> bool {
        matches!(
            self,
            Action::SendTo { .. } | Action::SendToRandomPeer { .. } | Action::Broadcast { .. }
        )
    }

    /// The payload carried by a send action.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Action::SendTo { payload, .. }
            | Action::SendToRandomPeer { payload }
            | Action::Broadcast { payload } => Some(payload),
            Action::SetTimer { .. } | Action::Notify(_) => None,
        }
    }
}
