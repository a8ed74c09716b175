//! Metrics collection and reporting for simulations.
//!
//! The collector is a [`TelemetrySink`]: the clock hands it every
//! notification and it folds them into counters and a latency histogram.

use gossipsim_core::{CollisionKind, DropReason, Notification, RelationshipKind, TelemetrySink};
use gossipsim_messages::PayloadKind;
use gossipsim_types::SimTime;
use hdrhistogram::Histogram;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// Collects metrics during a simulation run.
pub struct MetricsCollector {
    /// Deliveries per payload kind.
    delivered: BTreeMap<PayloadKind, u64>,

    /// Drops per reason.
    dropped: BTreeMap<DropReason, u64>,

    /// Collisions per kind.
    collisions: BTreeMap<CollisionKind, u64>,

    /// Relationship events per kind.
    relationships: BTreeMap<RelationshipKind, u64>,

    /// Remote events merged into a store.
    news_accepted: u64,

    /// Runs of remote events refused.
    news_rejected: u64,

    nodes_created: u64,
    nodes_killed: u64,

    /// Send-to-reception latency (microseconds).
    latency_histogram: Histogram<u64>,

    /// Samples for time-series analysis.
    samples: Vec<MetricsSample>,

    /// Deliveries at last sample.
    last_sample_delivered: u64,

    /// Last sample time.
    last_sample_time: SimTime,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            delivered: BTreeMap::new(),
            dropped: BTreeMap::new(),
            collisions: BTreeMap::new(),
            relationships: BTreeMap::new(),
            news_accepted: 0,
            news_rejected: 0,
            nodes_created: 0,
            nodes_killed: 0,
            latency_histogram: Histogram::new(3).expect("histogram creation should succeed"),
            samples: Vec::new(),
            last_sample_delivered: 0,
            last_sample_time: SimTime::ZERO,
        }
    }

    /// Record a delivery with its latency in seconds.
    pub fn record_delivery(&mut self, kind: PayloadKind, latency: f64) {
        *self.delivered.entry(kind).or_default() += 1;
        let latency_us = (latency.max(0.0) * 1_000_000.0).round() as u64;
        if let Err(error) = self.latency_histogram.record(latency_us) {
            warn!(latency_us, %error, "Latency out of histogram range");
        }
    }

    pub fn total_delivered(&self) -> u64 {
        self.delivered.values().sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }

    /// Take a sample for time-series tracking.
    pub fn sample(&mut self, time: SimTime, live_nodes: usize) {
        let delivered = self.total_delivered();
        let elapsed = time.since(self.last_sample_time);
        let delivery_throughput = if elapsed > 0.0 {
            delivered.saturating_sub(self.last_sample_delivered) as f64 / elapsed
        } else {
            0.0
        };

        self.samples.push(MetricsSample {
            time,
            live_nodes,
            delivered,
            dropped: self.total_dropped(),
            delivery_throughput,
        });
        self.last_sample_time = time;
        self.last_sample_delivered = delivered;
    }

    /// Finalize and generate a report.
    pub fn finalize(self, end_time: SimTime) -> SimulationReport {
        SimulationReport {
            total_delivered: self.delivered.values().sum(),
            total_dropped: self.dropped.values().sum(),
            delivered: self.delivered,
            dropped: self.dropped,
            collisions: self.collisions,
            relationships: self.relationships,
            news_accepted: self.news_accepted,
            news_rejected: self.news_rejected,
            nodes_created: self.nodes_created,
            nodes_killed: self.nodes_killed,
            latency_histogram: self.latency_histogram,
            samples: self.samples,
            end_time,
        }
    }
}

impl TelemetrySink for MetricsCollector {
    fn on_notification(&mut self, _time: SimTime, notification: &Notification) {
        match notification {
            Notification::Delivered { kind, latency, .. } => self.record_delivery(*kind, *latency),
            Notification::Dropped { reason, .. } => *self.dropped.entry(*reason).or_default() += 1,
            Notification::Collision { kind, .. } => {
                *self.collisions.entry(*kind).or_default() += 1
            }
            Notification::Relationship { kind, .. } => {
                *self.relationships.entry(*kind).or_default() += 1
            }
            Notification::NewsAccepted { count, .. } => self.news_accepted += *count as u64,
            Notification::NewsRejected { .. } => self.news_rejected += 1,
            Notification::NodeCreated { .. } => self.nodes_created += 1,
            Notification::NodeKilled { .. } => self.nodes_killed += 1,
        }
    }
}

/// A point-in-time metrics sample.
#[derive(Clone, Debug)]
pub struct MetricsSample {
    /// Simulation time of this sample.
    pub time: SimTime,
    /// Nodes alive at this point.
    pub live_nodes: usize,
    /// Cumulative deliveries.
    pub delivered: u64,
    /// Cumulative drops.
    pub dropped: u64,
    /// Deliveries per simulated second since the previous sample.
    pub delivery_throughput: f64,
}

/// Final simulation report.
pub struct SimulationReport {
    pub total_delivered: u64,
    pub total_dropped: u64,
    pub delivered: BTreeMap<PayloadKind, u64>,
    pub dropped: BTreeMap<DropReason, u64>,
    pub collisions: BTreeMap<CollisionKind, u64>,
    pub relationships: BTreeMap<RelationshipKind, u64>,
    /// Remote events merged across all stores.
    pub news_accepted: u64,
    pub news_rejected: u64,
    pub nodes_created: u64,
    pub nodes_killed: u64,
    /// Latency histogram (values in microseconds).
    latency_histogram: Histogram<u64>,
    pub samples: Vec<MetricsSample>,
    /// Simulated time when the run stopped.
    pub end_time: SimTime,
}

impl SimulationReport {
    pub fn p50_latency(&self) -> Duration {
        Duration::from_micros(self.latency_histogram.value_at_quantile(0.50))
    }

    pub fn p90_latency(&self) -> Duration {
        Duration::from_micros(self.latency_histogram.value_at_quantile(0.90))
    }

    pub fn p99_latency(&self) -> Duration {
        Duration::from_micros(self.latency_histogram.value_at_quantile(0.99))
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_micros(self.latency_histogram.max())
    }

    pub fn avg_latency(&self) -> Duration {
        Duration::from_micros(self.latency_histogram.mean() as u64)
    }

    pub fn dropped_by(&self, reason: DropReason) -> u64 {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    pub fn collisions_of(&self, kind: CollisionKind) -> u64 {
        self.collisions.get(&kind).copied().unwrap_or(0)
    }

    /// Delivered / (delivered + dropped).
    pub fn delivery_rate(&self) -> f64 {
        let attempted = self.total_delivered + self.total_dropped;
        if attempted > 0 {
            self.total_delivered as f64 / attempted as f64
        } else {
            0.0
        }
    }

    /// Print a summary of the report.
    pub fn print_summary(&self) {
        println!("\n═══════════════════════════════════════════");
        println!("           SIMULATION REPORT                ");
        println!("═══════════════════════════════════════════");
        println!();
        println!("Population:");
        println!("  Created:  {}", self.nodes_created);
        println!("  Killed:   {}", self.nodes_killed);
        println!();
        println!("Messages:");
        println!("  Delivered:     {}", self.total_delivered);
        for (kind, count) in &self.delivered {
            println!("    {:<10} {}", kind.name(), count);
        }
        println!("  Dropped:       {}", self.total_dropped);
        for (reason, count) in &self.dropped {
            println!("    {:<12} {}", reason.name(), count);
        }
        println!("  Delivery rate: {:.2}%", self.delivery_rate() * 100.0);
        println!();
        println!("Collisions:");
        for (kind, count) in &self.collisions {
            println!("  {:<24} {}", kind.name(), count);
        }
        println!();
        println!("Latency (delivered):");
        println!("  P50:  {:?}", self.p50_latency());
        println!("  P90:  {:?}", self.p90_latency());
        println!("  P99:  {:?}", self.p99_latency());
        println!("  Max:  {:?}", self.max_latency());
        println!("  Avg:  {:?}", self.avg_latency());
        println!();
        println!("Replication:");
        println!("  Events merged:   {}", self.news_accepted);
        println!("  Runs rejected:   {}", self.news_rejected);
        for (kind, count) in &self.relationships {
            println!("  {:<16} {}", format!("{}s:", kind.name()), count);
        }
        println!();
        println!("End time: {}", self.end_time);
        println!("═══════════════════════════════════════════\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_types::test_utils::test_identity;
    use gossipsim_types::NodeAddress;

    fn delivered(kind: PayloadKind, latency: f64) -> Notification {
        Notification::Delivered {
            from: NodeAddress(0),
            to: NodeAddress(1),
            kind,
            sent_at: SimTime::ZERO,
            latency,
        }
    }

    #[test]
    fn test_metrics_collection() {
        let mut collector = MetricsCollector::new();
        let t = SimTime::from_secs(1.0);

        for i in 0..100 {
            let latency = 0.010 + (i % 50) as f64 / 1000.0;
            collector.on_notification(t, &delivered(PayloadKind::Push, latency));
        }
        collector.on_notification(t, &delivered(PayloadKind::Heartbeat, 0.02));
        collector.on_notification(
            t,
            &Notification::Dropped {
                from: NodeAddress(0),
                to: NodeAddress(2),
                kind: PayloadKind::Pull,
                reason: DropReason::Collision,
            },
        );
        collector.on_notification(
            t,
            &Notification::Collision {
                node: NodeAddress(2),
                kind: CollisionKind::OverlappingReceptions,
            },
        );
        collector.on_notification(
            t,
            &Notification::NewsAccepted {
                node: test_identity(1),
                author: test_identity(2),
                count: 3,
            },
        );

        let report = collector.finalize(SimTime::from_secs(10.0));
        assert_eq!(report.total_delivered, 101);
        assert_eq!(report.delivered[&PayloadKind::Push], 100);
        assert_eq!(report.dropped_by(DropReason::Collision), 1);
        assert_eq!(report.dropped_by(DropReason::Loss), 0);
        assert_eq!(report.collisions_of(CollisionKind::OverlappingReceptions), 1);
        assert_eq!(report.news_accepted, 3);
        assert!(report.p50_latency() >= Duration::from_millis(10));
        assert!(report.max_latency() <= Duration::from_millis(60));
        assert!((report.delivery_rate() - 101.0 / 102.0).abs() < 1e-9);
    }

    #[test]
    fn test_samples_track_throughput() {
        let mut collector = MetricsCollector::new();
        for _ in 0..20 {
            collector.record_delivery(PayloadKind::Pull, 0.01);
        }
        collector.sample(SimTime::from_secs(10.0), 4);
        for _ in 0..5 {
            collector.record_delivery(PayloadKind::Pull, 0.01);
        }
        collector.sample(SimTime::from_secs(20.0), 5);

        let report = collector.finalize(SimTime::from_secs(20.0));
        assert_eq!(report.samples.len(), 2);
        assert_eq!(report.samples[0].delivered, 20);
        assert!((report.samples[0].delivery_throughput - 2.0).abs() < 1e-9);
        assert!((report.samples[1].delivery_throughput - 0.5).abs() < 1e-9);
        assert_eq!(report.samples[1].live_nodes, 5);
    }

    #[test]
    fn test_empty_report() {
        let report = MetricsCollector::new().finalize(SimTime::ZERO);
        assert_eq!(report.delivery_rate(), 0.0);
        assert_eq!(report.p99_latency(), Duration::ZERO);
    }
}
