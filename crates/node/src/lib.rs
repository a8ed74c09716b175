//! Simulated node state machine.
//!
//! A node is one participant on the modeled medium: a channel address, a
//! position, and the gossip state of the single identity it runs.

mod position;
mod state;

pub use position::Position;
pub use state::NodeStateMachine;
