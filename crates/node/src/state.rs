//! Node state machine.

use crate::Position;
use gossipsim_core::{Action, NodeInput, StateMachine, TimerId};
use gossipsim_gossip::{GossipConfig, GossipState, IntegrityError, Store};
use gossipsim_types::{Identity, KeyPair, NodeAddress, SimTime};
use tracing::instrument;

/// A simulated participant.
///
/// Routes [`NodeInput`]s to its [`GossipState`]. Owns its store exclusively;
/// other nodes only ever see it through payloads.
#[derive(Debug)]
pub struct NodeStateMachine {
    /// Channel address.
    address: NodeAddress,

    /// Location used for propagation delay and broadcast range.
    position: Position,

    /// Replication state of the node's identity.
    gossip: GossipState,

    /// Current time.
    now: SimTime,
}

impl NodeStateMachine {
    pub fn new(
        address: NodeAddress,
        position: Position,
        keypair: KeyPair,
        config: GossipConfig,
    ) -> Self {
        Self {
            address,
            position,
            gossip: GossipState::new(keypair, config),
            now: SimTime::ZERO,
        }
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn identity(&self) -> &Identity {
        self.gossip.identity()
    }

    pub fn gossip(&self) -> &GossipState {
        &self.gossip
    }

    pub fn store(&self) -> &Store {
        self.gossip.store()
    }

    /// Timer arming for a node that just joined.
    pub fn initial_actions(&self, gossip_offset: f64) -> Vec<Action> {
        self.gossip.initial_actions(gossip_offset)
    }

    /// Full chain re-verification of every held log.
    pub fn verify_integrity(&self) -> Result<(), IntegrityError> {
        self.store().verify_integrity()
    }
}

impl StateMachine for NodeStateMachine {
    #[instrument(skip(self, input), fields(node = self.address.0, input = input.type_name()))]
    fn handle(&mut self, input: NodeInput) -> Vec<Action> {
        match input {
            NodeInput::Timer(TimerId::Gossip) => self.gossip.on_gossip_timer(),
            NodeInput::Timer(TimerId::Heartbeat) => self.gossip.on_heartbeat_timer(),
            NodeInput::PayloadReceived { from, payload } => self.gossip.on_payload(from, payload),
            NodeInput::Author { content } => self.gossip.author(content),
        }
    }

    fn set_time(&mut self, now: SimTime) {
        self.now = now;
        self.gossip.set_time(now);
    }

    fn now(&self) -> SimTime {
        self.now
    }
}
