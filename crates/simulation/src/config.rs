//! Simulation configuration.

use crate::{ChannelConfig, ProcessRate};
use gossipsim_gossip::GossipConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("population bounds inconsistent: min {min}, initial {initial}, max {max}")]
    PopulationBounds {
        min: usize,
        initial: usize,
        max: usize,
    },

    #[error("followed range inconsistent: min {min} > max {max}")]
    FollowedRange { min: usize, max: usize },
}

/// Node population bounds and churn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Nodes created at t = 0.
    pub initial_nodes: usize,

    /// Creation stops once this many nodes are alive.
    pub max_nodes: usize,

    /// Kills are skipped while this many nodes or fewer are alive.
    pub min_nodes: usize,

    /// Inter-arrival of node creation after the initial population.
    pub create: ProcessRate,

    /// Inter-arrival of node kills.
    pub kill: ProcessRate,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_nodes: 10,
            max_nodes: 20,
            min_nodes: 2,
            create: ProcessRate::DISABLED,
            kill: ProcessRate::DISABLED,
        }
    }
}

/// Inter-arrival of random user actions, network-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionRates {
    pub post: ProcessRate,
    pub follow: ProcessRate,
    pub unfollow: ProcessRate,
    pub block: ProcessRate,
    pub unblock: ProcessRate,
}

impl Default for ActionRates {
    fn default() -> Self {
        Self {
            post: ProcessRate::new(2.0, 1.0),
            follow: ProcessRate::new(10.0, 4.0),
            unfollow: ProcessRate::DISABLED,
            block: ProcessRate::DISABLED,
            unblock: ProcessRate::DISABLED,
        }
    }
}

impl ActionRates {
    /// Every random action disabled.
    pub fn none() -> Self {
        Self {
            post: ProcessRate::DISABLED,
            follow: ProcessRate::DISABLED,
            unfollow: ProcessRate::DISABLED,
            block: ProcessRate::DISABLED,
            unblock: ProcessRate::DISABLED,
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every random draw of the run.
    pub seed: u64,

    /// Events after this time are not processed.
    pub stop_time: f64,

    /// Re-verify a node's chains after each of its events.
    pub verify_invariants: bool,

    /// Record `(time, kind, destination)` for every dispatched event.
    pub record_trace: bool,

    pub channel: ChannelConfig,
    pub population: PopulationConfig,
    pub actions: ActionRates,
    pub gossip: GossipConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            stop_time: 300.0,
            verify_invariants: false,
            record_trace: false,
            channel: ChannelConfig::default(),
            population: PopulationConfig::default(),
            actions: ActionRates::default(),
            gossip: GossipConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_stop_time(mut self, secs: f64) -> Self {
        self.stop_time = secs;
        self
    }

    pub fn with_verify_invariants(mut self, enabled: bool) -> Self {
        self.verify_invariants = enabled;
        self
    }

    pub fn with_record_trace(mut self, enabled: bool) -> Self {
        self.record_trace = enabled;
        self
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_initial_nodes(mut self, count: usize) -> Self {
        self.population.initial_nodes = count;
        self.population.max_nodes = self.population.max_nodes.max(count);
        self
    }

    pub fn with_population(mut self, population: PopulationConfig) -> Self {
        self.population = population;
        self
    }

    pub fn with_actions(mut self, actions: ActionRates) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_gossip(mut self, gossip: GossipConfig) -> Self {
        self.gossip = gossip;
        self
    }

    /// Check every value once, before a run or a reload.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("stop_time", self.stop_time)?;

        let ch = &self.channel;
        positive("channel.propagation_speed", ch.propagation_speed)?;
        positive("channel.transmission_time", ch.transmission_time)?;
        non_negative("channel.processing_delay", ch.processing_delay)?;
        non_negative("channel.max_random_delay", ch.max_random_delay)?;
        non_negative("channel.broadcast_range", ch.broadcast_range)?;
        if !(0.0..=1.0).contains(&ch.loss_probability) {
            return Err(ConfigError::InvalidProbability {
                name: "channel.loss_probability",
                value: ch.loss_probability,
            });
        }

        let pop = &self.population;
        if pop.min_nodes > pop.max_nodes || pop.initial_nodes > pop.max_nodes {
            return Err(ConfigError::PopulationBounds {
                min: pop.min_nodes,
                initial: pop.initial_nodes,
                max: pop.max_nodes,
            });
        }

        let rates = [
            ("population.create", pop.create),
            ("population.kill", pop.kill),
            ("actions.post", self.actions.post),
            ("actions.follow", self.actions.follow),
            ("actions.unfollow", self.actions.unfollow),
            ("actions.block", self.actions.block),
            ("actions.unblock", self.actions.unblock),
        ];
        for (name, rate) in rates {
            non_negative(name, rate.mean)?;
            non_negative(name, rate.variance)?;
        }

        let gossip = &self.gossip;
        positive("gossip.gossip_interval", gossip.gossip_interval)?;
        positive("gossip.heartbeat_interval", gossip.heartbeat_interval)?;
        if gossip.min_followed > gossip.max_followed {
            return Err(ConfigError::FollowedRange {
                min: gossip.min_followed,
                max: gossip.max_followed,
            });
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = SimulationConfig::default()
            .with_channel(ChannelConfig::default().with_loss_probability(1.5));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability { .. })
        ));

        let config = SimulationConfig::default().with_stop_time(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                name: "stop_time",
                ..
            })
        ));

        let mut config = SimulationConfig::default();
        config.population.min_nodes = 30;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PopulationBounds { .. })
        ));

        let config = SimulationConfig::default()
            .with_gossip(GossipConfig::default().with_followed_range(4, 2));
        assert_eq!(
            config.validate(),
            Err(ConfigError::FollowedRange { min: 4, max: 2 })
        );
    }

    #[test]
    fn test_with_initial_nodes_raises_max() {
        let config = SimulationConfig::default().with_initial_nodes(50);
        assert_eq!(config.population.max_nodes, 50);
        assert_eq!(config.validate(), Ok(()));
    }
}
