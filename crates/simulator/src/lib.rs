//! Gossip Simulator
//!
//! Command-line front end and metrics layer over the discrete-event
//! simulation in `gossipsim-simulation`.
//!
//! # Architecture
//!
//! - **Configuration**: TOML files layered over defaults, overridable from
//!   the command line
//! - **Metrics Collection**: delivery latency percentiles, drops by reason,
//!   collisions by kind, replication counters
//! - **Runner**: advances the clock in sample intervals and builds the report
//!
//! # Example
//!
//! ```ignore
//! use gossipsim_simulator::{Simulator, SimulatorConfig};
//! use gossipsim_simulation::SimulationConfig;
//!
//! let config = SimulatorConfig::new(
//!     SimulationConfig::default()
//!         .with_seed(12345)
//!         .with_initial_nodes(20),
//! );
//!
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run()?;
//!
//! println!("Delivery rate: {:.2}", report.delivery_rate());
//! println!("P99 latency: {:?}", report.p99_latency());
//! ```

pub mod config;
pub mod metrics;
pub mod runner;

pub use config::{LoadError, ReportConfig, SimulatorConfig};
pub use metrics::{MetricsCollector, MetricsSample, SimulationReport};
pub use runner::Simulator;
