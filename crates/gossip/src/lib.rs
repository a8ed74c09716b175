//! Scuttlebutt-style log replication.
//!
//! - [`Log`]: append-only, hash-chained events of one identity
//! - [`Store`]: a node's logs plus follow/block visibility sets
//! - [`ReplicationPolicy`]: [`OpenGossip`] or [`TransitiveInterest`]
//! - [`GossipState`]: the per-node protocol state machine driving
//!   PULL / PUSHPULL / PUSH / HEARTBEAT exchanges

mod config;
mod log;
mod policy;
mod state;
mod store;

pub use config::GossipConfig;
pub use log::{ChainError, Log, MergeError};
pub use policy::{OpenGossip, PolicyKind, ReplicationPolicy, TransitiveInterest};
pub use state::GossipState;
pub use store::{IntegrityError, MergeReport, Store};
