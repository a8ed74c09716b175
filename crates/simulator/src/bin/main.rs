//! Gossip Simulator CLI
//!
//! # Example
//!
//! ```bash
//! # Ten nodes, open gossip, five simulated minutes
//! gossipsim --nodes 10 --stop-time 300
//!
//! # Start from a file and override a few knobs
//! gossipsim --config sim.toml --policy transitive-interest --loss 0.05
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use gossipsim_gossip::PolicyKind;
use gossipsim_simulator::{Simulator, SimulatorConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    OpenGossip,
    TransitiveInterest,
}

impl From<Policy> for PolicyKind {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::OpenGossip => PolicyKind::OpenGossip,
            Policy::TransitiveInterest => PolicyKind::TransitiveInterest,
        }
    }
}

/// Gossip Simulator
///
/// Runs a deterministic discrete-event simulation of append-only log
/// replication over a shared wireless channel. Given the same seed,
/// produces identical results every run.
#[derive(Parser, Debug)]
#[command(name = "gossipsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML configuration file; flags below override it
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic simulation
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated seconds to run
    #[arg(short = 't', long)]
    stop_time: Option<f64>,

    /// Number of nodes created at time zero
    #[arg(short = 'n', long)]
    nodes: Option<usize>,

    /// Replication policy
    #[arg(short = 'p', long, value_enum)]
    policy: Option<Policy>,

    /// Probability that any single delivery is lost (0.0-1.0)
    #[arg(long)]
    loss: Option<f64>,

    /// Seconds a transmission occupies the medium
    #[arg(long)]
    transmission_time: Option<f64>,

    /// Verify every store after each node input
    #[arg(long)]
    verify: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<SimulatorConfig> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulatorConfig::default(),
        };

        let sim = &mut config.simulation;
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        if let Some(stop_time) = self.stop_time {
            sim.stop_time = stop_time;
        }
        if let Some(nodes) = self.nodes {
            sim.population.initial_nodes = nodes;
            sim.population.max_nodes = sim.population.max_nodes.max(nodes);
        }
        if let Some(policy) = self.policy {
            sim.gossip.policy = policy.into();
        }
        if let Some(loss) = self.loss {
            sim.channel.loss_probability = loss;
        }
        if let Some(secs) = self.transmission_time {
            sim.channel.transmission_time = secs;
        }
        sim.verify_invariants |= self.verify;

        config.validate().context("invalid command-line overrides")?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,gossipsim_simulator=info")),
        )
        .init();

    let config = Args::parse().into_config()?;

    info!(
        seed = config.simulation.seed,
        stop_time = config.simulation.stop_time,
        nodes = config.simulation.population.initial_nodes,
        policy = %config.simulation.gossip.policy,
        loss = config.simulation.channel.loss_probability,
        "Starting simulation"
    );

    let mut simulator = Simulator::new(config)?;
    let report = simulator.run()?;
    report.print_summary();

    let stats = simulator.stats();
    println!(
        "Events processed: {}  transmissions: {}  deferrals: {}",
        stats.events_processed, stats.transmissions, stats.deferrals
    );
    Ok(())
}
