//! Gossip protocol configuration.

use crate::PolicyKind;
use serde::{Deserialize, Serialize};

/// Per-node protocol parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Replication policy every node runs.
    pub policy: PolicyKind,

    /// Seconds between PULL rounds started by a node.
    pub gossip_interval: f64,

    /// Seconds between HEARTBEAT broadcasts.
    pub heartbeat_interval: f64,

    /// Minimum Follow events a new node authors (transitive interest only).
    pub min_followed: usize,

    /// Maximum Follow events a new node authors (transitive interest only).
    pub max_followed: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::OpenGossip,
            gossip_interval: 5.0,
            heartbeat_interval: 10.0,
            min_followed: 1,
            max_followed: 3,
        }
    }
}

impl GossipConfig {
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_gossip_interval(mut self, secs: f64) -> Self {
        self.gossip_interval = secs;
        self
    }

    pub fn with_heartbeat_interval(mut self, secs: f64) -> Self {
        self.heartbeat_interval = secs;
        self
    }

    pub fn with_followed_range(mut self, min: usize, max: usize) -> Self {
        self.min_followed = min;
        self.max_followed = max;
        self
    }
}
