use gossipsim_core::{CollisionKind, DropReason};
use std::collections::BTreeMap;

/// Counters collected by the clock during a run.
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Events popped and dispatched.
    pub events_processed: u64,
    pub nodes_created: u64,
    pub nodes_killed: u64,
    /// Random actions that produced an authored event.
    pub actions_generated: u64,
    /// Send actions returned by nodes.
    pub sends_requested: u64,
    /// Transmit attempts that went on the medium.
    pub transmissions: u64,
    /// Transmit attempts pushed back by a send-side collision.
    pub deferrals: u64,
    /// Per-destination waves created by transmissions.
    pub deliveries_scheduled: u64,
    pub messages_delivered: u64,
    pub dropped_loss: u64,
    pub dropped_collision: u64,
    pub dropped_unreachable: u64,
    /// Encoded payload bytes put on the medium.
    pub bytes_transmitted: u64,
    pub events_authored: u64,
    /// Remote event runs merged.
    pub merges_accepted: u64,
    /// Remote event runs refused.
    pub merges_rejected: u64,
    pub collisions: BTreeMap<CollisionKind, u64>,
}

impl SimulationStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Loss => self.dropped_loss += 1,
            DropReason::Collision => self.dropped_collision += 1,
            DropReason::Unreachable => self.dropped_unreachable += 1,
        }
    }

    pub fn record_collision(&mut self, kind: CollisionKind) {
        *self.collisions.entry(kind).or_default() += 1;
    }

    pub fn collisions_of(&self, kind: CollisionKind) -> u64 {
        self.collisions.get(&kind).copied().unwrap_or(0)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.dropped_loss + self.dropped_collision + self.dropped_unreachable
    }

    /// Fraction of resolved deliveries that were received.
    pub fn delivery_rate(&self) -> f64 {
        let resolved = self.messages_delivered + self.messages_dropped();
        if resolved == 0 {
            return 1.0;
        }
        self.messages_delivered as f64 / resolved as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_rate() {
        let mut stats = SimulationStats::default();
        assert_eq!(stats.delivery_rate(), 1.0);

        stats.messages_delivered = 3;
        stats.record_drop(DropReason::Loss);
        assert_eq!(stats.messages_dropped(), 1);
        assert!((stats.delivery_rate() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_collision_counts() {
        let mut stats = SimulationStats::default();
        stats.record_collision(CollisionKind::SendWhileSending);
        stats.record_collision(CollisionKind::SendWhileSending);
        assert_eq!(stats.collisions_of(CollisionKind::SendWhileSending), 2);
        assert_eq!(stats.collisions_of(CollisionKind::OverlappingReceptions), 0);
    }
}
