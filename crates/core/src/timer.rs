/// Timers a node can arm.
///
/// Setting a timer that is already pending replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Start a PULL round with a random peer.
    Gossip,
    /// Broadcast presence to nodes in range.
    Heartbeat,
}
