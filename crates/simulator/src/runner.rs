//! Main simulator runner.
//!
//! Drives a [`SimulationClock`] in sample-sized slices and feeds every
//! notification into a shared [`MetricsCollector`].

use crate::config::SimulatorConfig;
use crate::metrics::{MetricsCollector, SimulationReport};
use gossipsim_simulation::{ConfigError, SimulationClock, SimulationError, SimulationStats};
use gossipsim_types::SimTime;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

/// Simulator that owns the clock and collects metrics from it.
pub struct Simulator {
    /// Underlying discrete-event clock.
    clock: SimulationClock,

    /// Shared with the clock as a telemetry sink.
    metrics: Rc<RefCell<MetricsCollector>>,

    config: SimulatorConfig,
}

impl Simulator {
    /// Create a simulator; initial nodes appear on the first step.
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut clock = SimulationClock::new(config.simulation.clone())?;
        let metrics = Rc::new(RefCell::new(MetricsCollector::new()));
        clock.add_sink(Box::new(metrics.clone()));

        info!(
            seed = config.simulation.seed,
            stop_time = config.simulation.stop_time,
            initial_nodes = config.simulation.population.initial_nodes,
            policy = %config.simulation.gossip.policy,
            "Simulator created"
        );

        Ok(Self {
            clock,
            metrics,
            config,
        })
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Mutable access for scripting user actions before or between runs.
    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    pub fn stats(&self) -> &SimulationStats {
        self.clock.stats()
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Advance `secs` of simulated time, sampling at every interval boundary.
    pub fn run_for(&mut self, secs: f64) -> Result<(), SimulationError> {
        let stop = SimTime::from_secs(self.config.simulation.stop_time);
        let end = (self.clock.now() + secs).min(stop);
        let interval = self.config.report.sample_interval;

        let mut cursor = self.clock.now();
        while cursor < end {
            cursor = (cursor + interval).min(end);
            self.clock.run_until(cursor)?;
            self.metrics
                .borrow_mut()
                .sample(cursor, self.clock.live_nodes());
            debug!(
                time = %cursor,
                live_nodes = self.clock.live_nodes(),
                pending = self.clock.pending_events(),
                "Sampled metrics"
            );
        }
        Ok(())
    }

    /// Run to the configured stop time and produce the report.
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        let remaining = self.config.simulation.stop_time - self.clock.now().as_secs();
        self.run_for(remaining.max(0.0))?;
        Ok(self.report())
    }

    /// Drain the collected metrics into a report.
    pub fn report(&mut self) -> SimulationReport {
        let collector = std::mem::take(&mut *self.metrics.borrow_mut());
        let report = collector.finalize(self.clock.now());
        info!(
            delivered = report.total_delivered,
            dropped = report.total_dropped,
            delivery_rate = report.delivery_rate(),
            end_time = %report.end_time,
            "Simulation report ready"
        );
        report
    }

    /// Swap in a new configuration mid-run.
    pub fn reload(&mut self, config: SimulatorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.clock.reload_config(config.simulation.clone())?;
        self.config = config;
        Ok(())
    }
}
