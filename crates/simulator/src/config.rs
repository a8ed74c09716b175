//! Configuration types for the simulator.

use gossipsim_simulation::{ConfigError, SimulationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}

/// Configuration for a simulator run.
///
/// ```toml
/// [simulation]
/// seed = 7
/// stop_time = 600.0
///
/// [simulation.channel]
/// loss_probability = 0.05
///
/// [simulation.gossip]
/// policy = "transitive_interest"
///
/// [report]
/// sample_interval = 30.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub simulation: SimulationConfig,
    pub report: ReportConfig,
}

/// Reporting options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Seconds of simulated time between progress samples.
    pub sample_interval: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_interval: 60.0,
        }
    }
}

impl SimulatorConfig {
    pub fn new(simulation: SimulationConfig) -> Self {
        Self {
            simulation,
            report: ReportConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, LoadError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_sample_interval(mut self, secs: f64) -> Self {
        self.report.sample_interval = secs;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        if !(self.report.sample_interval > 0.0 && self.report.sample_interval.is_finite()) {
            return Err(ConfigError::NotPositive {
                name: "report.sample_interval",
                value: self.report.sample_interval,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_gossip::PolicyKind;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            [simulation]
            seed = 7
            stop_time = 600.0

            [simulation.channel]
            loss_probability = 0.05

            [simulation.gossip]
            policy = "transitive_interest"

            [simulation.actions.block]
            mean = 30.0
            variance = 10.0
            "#,
        )
        .unwrap();

        let sim = &config.simulation;
        assert_eq!(sim.seed, 7);
        assert_eq!(sim.stop_time, 600.0);
        assert_eq!(sim.channel.loss_probability, 0.05);
        assert_eq!(sim.channel.transmission_time, 0.01);
        assert_eq!(sim.gossip.policy, PolicyKind::TransitiveInterest);
        assert_eq!(sim.actions.block.mean, 30.0);
        assert_eq!(sim.population.initial_nodes, 10);
        assert_eq!(config.report.sample_interval, 60.0);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(
            SimulatorConfig::from_toml_str("").unwrap(),
            SimulatorConfig::default()
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = SimulatorConfig::from_toml_str(
            r#"
            [simulation.channel]
            loss_probability = 2.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Invalid(ConfigError::InvalidProbability { .. })));

        let err = SimulatorConfig::from_toml_str("[simulation]\nseed = \"x\"").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }
}
