//! Collision-aware channel model.
//!
//! Each transmission occupies the sender for `transmission_time` seconds and
//! occupies the receiver for the same duration ending at arrival. Overlap of
//! two windows at one node is a collision: send-side collisions defer the
//! send, receive-side collisions drop the reception.

use gossipsim_core::CollisionKind;
use gossipsim_node::Position;
use gossipsim_types::{NodeAddress, SimTime};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channel parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Distance units per second.
    pub propagation_speed: f64,

    /// Seconds a node spends putting one message on the medium.
    pub transmission_time: f64,

    /// Fixed delay between a send intent and the transmit attempt.
    pub processing_delay: f64,

    /// Upper bound of the uniform jitter added to every attempt.
    pub max_random_delay: f64,

    /// Probability that an otherwise successful delivery is lost.
    pub loss_probability: f64,

    /// Broadcast reach, in the same units as node positions.
    pub broadcast_range: f64,

    /// Drop receptions that overlap another window at the receiver.
    pub receive_collisions: bool,

    /// Log collisions at info level.
    pub debug_collisions: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            propagation_speed: 10.0,
            transmission_time: 0.01,
            processing_delay: 0.001,
            max_random_delay: 0.05,
            loss_probability: 0.0,
            broadcast_range: 0.5,
            receive_collisions: true,
            debug_collisions: false,
        }
    }
}

impl ChannelConfig {
    pub fn with_transmission_time(mut self, secs: f64) -> Self {
        self.transmission_time = secs;
        self
    }

    pub fn with_propagation_speed(mut self, speed: f64) -> Self {
        self.propagation_speed = speed;
        self
    }

    pub fn with_jitter(mut self, processing_delay: f64, max_random_delay: f64) -> Self {
        self.processing_delay = processing_delay;
        self.max_random_delay = max_random_delay;
        self
    }

    pub fn with_loss_probability(mut self, probability: f64) -> Self {
        self.loss_probability = probability;
        self
    }

    pub fn with_broadcast_range(mut self, range: f64) -> Self {
        self.broadcast_range = range;
        self
    }

    pub fn with_receive_collisions(mut self, enabled: bool) -> Self {
        self.receive_collisions = enabled;
        self
    }
}

/// Outcome of a transmit attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SendDecision {
    /// The medium is free; transmit now.
    Transmit,
    /// Retry at `until`.
    Defer { until: SimTime, kind: CollisionKind },
}

/// Shared medium state.
#[derive(Debug)]
pub struct Channel {
    config: ChannelConfig,
    /// End of each node's most recent transmission window.
    last_send_end: BTreeMap<NodeAddress, SimTime>,
}

impl Channel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            last_send_end: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Swap parameters; transmission history is kept.
    pub fn set_config(&mut self, config: ChannelConfig) {
        self.config = config;
    }

    /// Closed windows `[start1, end1]` and `[start2, end2]` overlap.
    pub fn is_collision(start1: SimTime, end1: SimTime, start2: SimTime, end2: SimTime) -> bool {
        start1.max(start2) <= end1.min(end2)
    }

    /// Two windows of one transmission time each, given their end times.
    pub fn windows_collide(&self, end1: SimTime, end2: SimTime) -> bool {
        let tx = self.config.transmission_time;
        Self::is_collision(end1 - tx, end1, end2 - tx, end2)
    }

    /// Decide what a node attempting to send at `attempt` should do.
    ///
    /// `next_reception` is the arrival time of the earliest pending delivery
    /// to this node.
    pub fn decide(
        &self,
        node: NodeAddress,
        attempt: SimTime,
        next_reception: Option<SimTime>,
        rng: &mut ChaCha8Rng,
    ) -> SendDecision {
        let tx = self.config.transmission_time;

        if let Some(&last_end) = self.last_send_end.get(&node) {
            if Self::is_collision(attempt, attempt + tx, last_end - tx, last_end) {
                return SendDecision::Defer {
                    until: self.jittered_after(last_end, rng),
                    kind: CollisionKind::SendWhileSending,
                };
            }
        }

        match next_reception {
            None => SendDecision::Transmit,
            Some(arrival) if attempt < arrival - tx => SendDecision::Transmit,
            Some(arrival) => SendDecision::Defer {
                until: self.jittered_after(arrival, rng),
                kind: CollisionKind::SendWhileReceiving,
            },
        }
    }

    /// Occupy `node` from `start`; returns the window end.
    pub fn begin_transmission(&mut self, node: NodeAddress, start: SimTime) -> SimTime {
        let end = start + self.config.transmission_time;
        self.last_send_end.insert(node, end);
        end
    }

    /// Seconds from transmission start to the end of reception.
    pub fn propagation_delay(&self, from: &Position, to: &Position) -> f64 {
        from.distance(to) / self.config.propagation_speed + self.config.transmission_time
    }

    pub fn in_range(&self, from: &Position, to: &Position) -> bool {
        from.distance(to) <= self.config.broadcast_range
    }

    /// Whether this delivery is randomly lost.
    pub fn roll_loss(&self, rng: &mut ChaCha8Rng) -> bool {
        let p = self.config.loss_probability;
        p >= 1.0 || (p > 0.0 && rng.gen_bool(p))
    }

    /// Delay between a send intent and its first transmit attempt.
    pub fn send_jitter(&self, rng: &mut ChaCha8Rng) -> f64 {
        self.config.processing_delay + self.random_delay(rng)
    }

    /// Whether a reception ending at `arrival` overlaps `node`'s last send.
    pub fn reception_collides_with_send(&self, node: NodeAddress, arrival: SimTime) -> bool {
        self.last_send_end
            .get(&node)
            .is_some_and(|&end| self.windows_collide(arrival, end))
    }

    /// Last transmission end of `node`, if it ever sent.
    pub fn last_send_end(&self, node: NodeAddress) -> Option<SimTime> {
        self.last_send_end.get(&node).copied()
    }

    /// Drop the history of a removed node.
    pub fn forget(&mut self, node: NodeAddress) {
        self.last_send_end.remove(&node);
    }

    fn random_delay(&self, rng: &mut ChaCha8Rng) -> f64 {
        let max = self.config.max_random_delay;
        if max > 0.0 {
            rng.gen_range(0.0..max)
        } else {
            0.0
        }
    }

    /// Retry time strictly after `base`.
    fn jittered_after(&self, base: SimTime, rng: &mut ChaCha8Rng) -> SimTime {
        let candidate = base + (self.config.processing_delay + self.random_delay(rng));
        candidate.max(base.next_after())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn channel(tx: f64) -> Channel {
        Channel::new(ChannelConfig::default().with_transmission_time(tx))
    }

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs)
    }

    #[test]
    fn test_is_collision_closed_windows() {
        assert!(Channel::is_collision(t(10.0), t(12.0), t(11.0), t(13.0)));
        assert!(Channel::is_collision(t(10.0), t(12.0), t(12.0), t(14.0)));
        assert!(!Channel::is_collision(t(10.0), t(12.0), t(12.5), t(14.5)));
    }

    #[test]
    fn test_send_while_sending_defers_past_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ch = channel(2.0);
        let a = NodeAddress(0);
        assert_eq!(ch.decide(a, t(10.0), None, &mut rng), SendDecision::Transmit);
        assert_eq!(ch.begin_transmission(a, t(10.0)), t(12.0));

        match ch.decide(a, t(11.0), None, &mut rng) {
            SendDecision::Defer { until, kind } => {
                assert_eq!(kind, CollisionKind::SendWhileSending);
                assert!(until > t(12.0));
            }
            other => panic!("expected deferral, got {other:?}"),
        }
    }

    #[test]
    fn test_send_before_reception_window_is_allowed() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let ch = channel(1.0);
        let a = NodeAddress(0);
        // Reception occupies [4, 5].
        assert_eq!(
            ch.decide(a, t(2.5), Some(t(5.0)), &mut rng),
            SendDecision::Transmit
        );
        assert!(matches!(
            ch.decide(a, t(4.2), Some(t(5.0)), &mut rng),
            SendDecision::Defer {
                kind: CollisionKind::SendWhileReceiving,
                ..
            }
        ));
    }

    #[test]
    fn test_deferral_without_jitter_is_still_strictly_later() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ch = Channel::new(
            ChannelConfig::default()
                .with_transmission_time(1.0)
                .with_jitter(0.0, 0.0),
        );
        let a = NodeAddress(0);
        ch.begin_transmission(a, t(0.0));
        match ch.decide(a, t(0.5), None, &mut rng) {
            SendDecision::Defer { until, .. } => assert!(until > t(1.0)),
            other => panic!("expected deferral, got {other:?}"),
        }
    }

    #[test]
    fn test_propagation_and_range() {
        let ch = Channel::new(
            ChannelConfig::default()
                .with_propagation_speed(2.0)
                .with_transmission_time(0.5)
                .with_broadcast_range(0.4),
        );
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.3, 0.4);
        assert!((ch.propagation_delay(&a, &b) - 0.75).abs() < 1e-12);
        assert!(!ch.in_range(&a, &b));
        assert!(ch.in_range(&a, &Position::new(0.4, 0.0)));
    }

    #[test]
    fn test_loss_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let lossless = channel(0.1);
        let lossy = Channel::new(ChannelConfig::default().with_loss_probability(1.0));
        for _ in 0..100 {
            assert!(!lossless.roll_loss(&mut rng));
            assert!(lossy.roll_loss(&mut rng));
        }
    }

    #[test]
    fn test_reception_collides_with_own_send() {
        let mut ch = channel(1.0);
        let a = NodeAddress(1);
        ch.begin_transmission(a, t(3.0));
        assert!(ch.reception_collides_with_send(a, t(4.5)));
        assert!(!ch.reception_collides_with_send(a, t(5.5)));
        ch.forget(a);
        assert!(!ch.reception_collides_with_send(a, t(4.5)));
    }
}
