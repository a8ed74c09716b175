//! Domain-specific identifier types.

use crate::PublicKey;
use sbor::prelude::*;
use std::fmt;

/// A gossip participant's identity: the public key that authors a log.
///
/// Stable for the lifetime of a node. Used as the key for logs and
/// frontier entries, so it must be totally ordered for deterministic
/// iteration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct Identity(pub PublicKey);

impl Identity {
    /// The underlying verifying key.
    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }

    /// Short hex prefix, enough to tell identities apart in logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }
}

impl From<PublicKey> for Identity {
    fn from(key: PublicKey) -> Self {
        Identity(key)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.short())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.short())
    }
}

/// Simulation-level address of a node on the modeled medium.
///
/// Allocated by the simulation context from a counter that restarts at zero
/// for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct NodeAddress(pub u32);

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}
