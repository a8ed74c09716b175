//! Channel behaviour observed through whole runs.

use gossipsim_core::{CollisionKind, Notification, RecordingSink};
use gossipsim_messages::PayloadKind;
use gossipsim_node::Position;
use gossipsim_simulation::{
    ActionRates, Channel, ChannelConfig, SendDecision, SimulationClock, SimulationConfig,
};
use gossipsim_types::{NodeAddress, SimTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_send_during_own_transmission_is_deferred_past_window() {
    let config = ChannelConfig::default().with_transmission_time(2.0);
    let max_jitter = config.processing_delay + config.max_random_delay;
    let mut channel = Channel::new(config);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let a = NodeAddress(0);

    let t = SimTime::from_secs;
    assert_eq!(channel.decide(a, t(10.0), None, &mut rng), SendDecision::Transmit);
    channel.begin_transmission(a, t(10.0));

    match channel.decide(a, t(11.0), None, &mut rng) {
        SendDecision::Defer { until, kind } => {
            assert_eq!(kind, CollisionKind::SendWhileSending);
            assert!(until > t(12.0));
            assert!(until <= t(12.0 + max_jitter));
        }
        SendDecision::Transmit => panic!("send at t=11 must not go out during [10, 12]"),
    }
}

#[test]
fn test_total_loss_means_no_replication() {
    let config = SimulationConfig::default()
        .with_seed(11)
        .with_initial_nodes(5)
        .with_stop_time(120.0)
        .with_channel(ChannelConfig::default().with_loss_probability(1.0));
    let mut clock = SimulationClock::new(config).unwrap();
    let sink = Rc::new(RefCell::new(RecordingSink::default()));
    clock.add_sink(Box::new(sink.clone()));
    clock.run().unwrap();

    let stats = clock.stats();
    assert_eq!(stats.messages_delivered, 0);
    assert!(stats.dropped_loss > 0);
    assert_eq!(stats.merges_accepted, 0);
    assert_eq!(stats.delivery_rate(), 0.0);

    for node in clock.nodes() {
        let store = node.store();
        assert_eq!(store.event_count(), store.own_log().len());
    }
    assert!(!sink
        .borrow()
        .notifications
        .iter()
        .any(|(_, n)| matches!(n, Notification::Delivered { .. })));
}

#[test]
fn test_long_transmissions_cause_collisions_and_deferrals() {
    let config = SimulationConfig::default()
        .with_seed(5)
        .with_initial_nodes(8)
        .with_stop_time(120.0)
        .with_actions(ActionRates::none())
        .with_channel(
            ChannelConfig::default()
                .with_transmission_time(0.5)
                .with_broadcast_range(2.0),
        );
    let mut clock = SimulationClock::new(config).unwrap();
    clock.run().unwrap();

    let stats = clock.stats();
    let collisions: u64 = stats.collisions.values().sum();
    assert!(collisions > 0);
    assert!(stats.deferrals > 0);
    assert_eq!(
        stats.deferrals,
        stats.collisions_of(CollisionKind::SendWhileSending)
            + stats.collisions_of(CollisionKind::SendWhileReceiving)
    );
    // Deferred sends are retried, never lost.
    assert!(stats.transmissions > 0);
}

#[test]
fn test_broadcast_only_reaches_nodes_in_range() {
    let config = SimulationConfig::default()
        .with_initial_nodes(0)
        .with_actions(ActionRates::none())
        .with_stop_time(12.0)
        .with_channel(ChannelConfig::default().with_broadcast_range(0.3));
    let mut clock = SimulationClock::new(config).unwrap();
    let sink = Rc::new(RefCell::new(RecordingSink::default()));
    clock.add_sink(Box::new(sink.clone()));

    let near_a = clock.spawn_node(Some(Position::new(0.1, 0.1))).unwrap().unwrap();
    let near_b = clock.spawn_node(Some(Position::new(0.2, 0.1))).unwrap().unwrap();
    let far = clock.spawn_node(Some(Position::new(0.9, 0.9))).unwrap().unwrap();
    clock.run().unwrap();

    // Heartbeats fire at t = 10; unicast gossip replies are not range-limited,
    // so only look at heartbeat deliveries.
    let heartbeat_pairs: Vec<(NodeAddress, NodeAddress)> = sink
        .borrow()
        .notifications
        .iter()
        .filter_map(|(_, n)| match n {
            Notification::Delivered { from, to, kind, .. }
                if *kind == PayloadKind::Heartbeat =>
            {
                Some((*from, *to))
            }
            Notification::Dropped { from, to, kind, .. }
                if *kind == PayloadKind::Heartbeat =>
            {
                Some((*from, *to))
            }
            _ => None,
        })
        .collect();

    assert!(!heartbeat_pairs.is_empty());
    assert!(heartbeat_pairs
        .iter()
        .all(|(from, to)| *from != far && *to != far));
    assert!(
        heartbeat_pairs.contains(&(near_a, near_b)) || heartbeat_pairs.contains(&(near_b, near_a))
    );
    assert!(clock.now() <= SimTime::from_secs(12.0));
}
