//! The simulation clock.
//!
//! Merges every [`Scheduler`] by always dispatching the globally earliest
//! pending event, advances time monotonically, and performs the actions nodes
//! return. Given the same configuration (seed included) a run is fully
//! reproducible.

use crate::channel::{Channel, SendDecision};
use crate::event::{PendingSend, SimEvent, Target, Wave};
use crate::event_queue::{EventKey, Sequence};
use crate::scheduler::{OnDemandScheduler, ProcessKind, QueuedScheduler, Scheduler, Tick};
use crate::{ConfigError, SimulationConfig, SimulationStats};
use gossipsim_core::{
    Action, CollisionKind, DropReason, NodeInput, Notification, StateMachine, TelemetrySink,
    TimerId,
};
use gossipsim_gossip::{IntegrityError, PolicyKind};
use gossipsim_messages::codec::wire_size;
use gossipsim_messages::Payload;
use gossipsim_node::{NodeStateMachine, Position};
use gossipsim_types::{Content, Identity, KeyPair, NodeAddress, SimTime};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Fatal simulation outcomes.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A scheduler produced an event earlier than the last processed one.
    #[error("time regression: event at {event_time} after clock reached {now}")]
    TimeRegression { now: SimTime, event_time: SimTime },

    /// A node's store failed full chain verification.
    #[error("chain integrity violated at {node}")]
    ChainCorrupted {
        node: NodeAddress,
        #[source]
        source: IntegrityError,
    },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// One dispatched event, as recorded when tracing is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub time: SimTime,
    pub kind: &'static str,
    pub destination: Option<NodeAddress>,
}

/// Where the next event comes from.
#[derive(Debug, Clone, Copy)]
enum Source {
    Network,
    Local,
    Generator(usize),
}

/// Discrete-event simulation of gossiping nodes on a shared medium.
pub struct SimulationClock {
    /// Live nodes. Addresses are never reused.
    nodes: BTreeMap<NodeAddress, NodeStateMachine>,

    /// Channel deliveries.
    network: QueuedScheduler,

    /// Timers, transmit attempts, scheduled user actions, node creation.
    local: QueuedScheduler,

    /// Random processes and any externally added schedulers.
    generators: Vec<Box<dyn Scheduler>>,

    channel: Channel,

    /// Single source of randomness for the run.
    rng: ChaCha8Rng,

    /// Tie-break counter shared by all schedulers.
    sequence: Sequence,

    /// Time of the last dispatched event.
    now: SimTime,

    next_address: u32,
    next_wave: u64,
    post_counter: u64,

    /// Pending timer per (node, timer) so re-arming replaces it.
    timers: BTreeMap<(NodeAddress, TimerId), EventKey>,

    stats: SimulationStats,
    trace: Vec<TraceEntry>,
    sinks: Vec<Box<dyn TelemetrySink>>,
    config: SimulationConfig,
}

impl SimulationClock {
    /// Build a clock and schedule creation of the initial population at t = 0.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let generators = ProcessKind::ALL
            .iter()
            .map(|kind| {
                Box::new(OnDemandScheduler::new(*kind, kind.rate(&config))) as Box<dyn Scheduler>
            })
            .collect();

        let mut clock = Self {
            nodes: BTreeMap::new(),
            network: QueuedScheduler::new("network"),
            local: QueuedScheduler::new("local"),
            generators,
            channel: Channel::new(config.channel.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            sequence: Sequence::new(),
            now: SimTime::ZERO,
            next_address: 0,
            next_wave: 0,
            post_counter: 0,
            timers: BTreeMap::new(),
            stats: SimulationStats::default(),
            trace: Vec::new(),
            sinks: Vec::new(),
            config,
        };

        for _ in 0..clock.config.population.initial_nodes {
            let key = clock.sequence.key(SimTime::ZERO);
            clock
                .local
                .schedule(key, SimEvent::CreateNode { initial: true });
        }

        info!(
            seed = clock.config.seed,
            initial_nodes = clock.config.population.initial_nodes,
            policy = %clock.config.gossip.policy,
            stop_time = clock.config.stop_time,
            "Created simulation clock"
        );

        Ok(clock)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Recorded `(time, kind, destination)` tuples; empty unless enabled.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn node(&self, address: NodeAddress) -> Option<&NodeStateMachine> {
        self.nodes.get(&address)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeStateMachine> {
        self.nodes.values()
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Events waiting in every scheduler.
    pub fn pending_events(&self) -> usize {
        self.network.len()
            + self.local.len()
            + self.generators.iter().map(|g| g.len()).sum::<usize>()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Control
    // ═══════════════════════════════════════════════════════════════════════

    /// Register an extra event source.
    pub fn add_scheduler(&mut self, scheduler: Box<dyn Scheduler>) {
        debug!(scheduler = scheduler.name(), "Added scheduler");
        self.generators.push(scheduler);
    }

    /// Register a telemetry subscriber.
    pub fn add_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }

    /// Replace the configuration snapshot.
    ///
    /// Channel parameters and process rates apply from the next step; the
    /// gossip parameters apply to nodes created afterwards. The seed is not
    /// re-applied.
    pub fn reload_config(&mut self, config: SimulationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.channel.set_config(config.channel.clone());
        for generator in &mut self.generators {
            generator.reconfigure(&config);
        }
        self.config = config;
        info!(time = %self.now, "Reloaded configuration");
        Ok(())
    }

    /// Create a node right now, optionally at a fixed position.
    pub fn spawn_node(
        &mut self,
        position: Option<Position>,
    ) -> Result<Option<NodeAddress>, SimulationError> {
        self.create_node(false, position)
    }

    /// Have `node` author `content` after `delay` seconds.
    pub fn schedule_user_action(&mut self, node: NodeAddress, delay: f64, content: Content) {
        let key = self.sequence.key(self.now + delay);
        self.local.schedule(key, SimEvent::Author { node, content });
    }

    /// Remove `node` after `delay` seconds.
    pub fn schedule_kill_node(&mut self, node: NodeAddress, delay: f64) {
        let key = self.sequence.key(self.now + delay);
        self.local
            .schedule(key, SimEvent::KillNode { target: Some(node) });
    }

    /// Run until the stop time or until nothing is pending.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        while self.step()? {}
        info!(
            final_time = %self.now,
            events_processed = self.stats.events_processed,
            live_nodes = self.nodes.len(),
            delivery_rate = self.stats.delivery_rate(),
            "Simulation finished"
        );
        Ok(())
    }

    /// Run until `end` (or the stop time, whichever is earlier).
    pub fn run_until(&mut self, end: SimTime) -> Result<(), SimulationError> {
        let limit = end.min(SimTime::from_secs(self.config.stop_time));
        while self.step_bounded(limit)? {}
        trace!(
            events_processed = self.stats.events_processed,
            final_time = %self.now,
            "Simulation step complete"
        );
        Ok(())
    }

    /// Dispatch one event. Returns `false` when the run is over.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        self.step_bounded(SimTime::from_secs(self.config.stop_time))
    }

    fn step_bounded(&mut self, limit: SimTime) -> Result<bool, SimulationError> {
        self.refresh_schedulers();

        let Some((source, key)) = self.earliest() else {
            debug!(time = %self.now, "No pending events");
            return Ok(false);
        };
        if key.time > limit {
            return Ok(false);
        }
        let Some((key, event)) = self.pop_from(source) else {
            return Ok(false);
        };

        if key.time < self.now {
            return Err(SimulationError::TimeRegression {
                now: self.now,
                event_time: key.time,
            });
        }
        self.now = key.time;
        self.stats.events_processed += 1;

        let kind = event.kind_name();
        let destination = event.destination();
        if self.config.record_trace {
            self.trace.push(TraceEntry {
                time: self.now,
                kind,
                destination,
            });
        }
        trace!(
            time = %self.now,
            kind,
            node = destination.map(|a| a.0),
            "Processing event"
        );

        self.dispatch(key, event)?;
        Ok(true)
    }

    fn refresh_schedulers(&mut self) {
        let mut tick = Tick {
            now: self.now,
            rng: &mut self.rng,
            sequence: &mut self.sequence,
        };
        self.network.refresh(&mut tick);
        self.local.refresh(&mut tick);
        for generator in &mut self.generators {
            generator.refresh(&mut tick);
        }
    }

    fn earliest(&self) -> Option<(Source, EventKey)> {
        let candidates = [
            (Source::Network, self.network.peek()),
            (Source::Local, self.local.peek()),
        ]
        .into_iter()
        .chain(
            self.generators
                .iter()
                .enumerate()
                .map(|(i, g)| (Source::Generator(i), g.peek())),
        );

        let mut best: Option<(Source, EventKey)> = None;
        for (source, peeked) in candidates {
            if let Some((key, _)) = peeked {
                if best.map_or(true, |(_, current)| *key < current) {
                    best = Some((source, *key));
                }
            }
        }
        best
    }

    fn pop_from(&mut self, source: Source) -> Option<(EventKey, SimEvent)> {
        match source {
            Source::Network => self.network.pop(),
            Source::Local => self.local.pop(),
            Source::Generator(i) => self.generators.get_mut(i)?.pop(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════════

    fn dispatch(&mut self, key: EventKey, event: SimEvent) -> Result<(), SimulationError> {
        match event {
            SimEvent::CreateNode { initial } => {
                self.create_node(initial, None)?;
                Ok(())
            }
            SimEvent::KillNode { target } => {
                self.kill_node(target);
                Ok(())
            }
            SimEvent::RandomAction(kind) => self.random_action(kind),
            SimEvent::Author { node, content } => {
                if self.nodes.contains_key(&node) {
                    self.stats.events_authored += 1;
                }
                self.handle_input(node, NodeInput::Author { content })
            }
            SimEvent::Timer { node, id } => {
                if self.timers.get(&(node, id)) == Some(&key) {
                    self.timers.remove(&(node, id));
                }
                self.handle_input(node, NodeInput::Timer(id))
            }
            SimEvent::Transmit { from, send } => {
                self.transmit(from, send);
                Ok(())
            }
            SimEvent::Deliver(wave) => self.deliver(*wave),
        }
    }

    /// Feed one input to a node and perform what it returns.
    fn handle_input(
        &mut self,
        address: NodeAddress,
        input: NodeInput,
    ) -> Result<(), SimulationError> {
        let Some(node) = self.nodes.get_mut(&address) else {
            trace!(
                node = address.0,
                input = input.type_name(),
                "Discarding input for removed node"
            );
            return Ok(());
        };
        node.set_time(self.now);
        let actions = node.handle(input);
        self.process_actions(address, actions);
        self.check_invariants(address)
    }

    fn process_actions(&mut self, from: NodeAddress, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SendTo { to, payload } => {
                    self.request_send(from, Target::Unicast(to), payload);
                }
                Action::SendToRandomPeer { payload } => match self.random_peer(from) {
                    Some(to) => self.request_send(from, Target::Unicast(to), payload),
                    None => trace!(node = from.0, "No peer to gossip with"),
                },
                Action::Broadcast { payload } => {
                    self.request_send(from, Target::Broadcast, payload);
                }
                Action::SetTimer { id, delay } => self.set_timer(from, id, delay),
                Action::Notify(notification) => self.notify(notification),
            }
        }
    }

    fn set_timer(&mut self, node: NodeAddress, id: TimerId, delay: f64) {
        if let Some(previous) = self.timers.remove(&(node, id)) {
            self.local.remove(&previous);
        }
        let key = self.sequence.key(self.now + delay);
        self.local.schedule(key, SimEvent::Timer { node, id });
        self.timers.insert((node, id), key);
    }

    fn check_invariants(&self, address: NodeAddress) -> Result<(), SimulationError> {
        if !self.config.verify_invariants {
            return Ok(());
        }
        match self.nodes.get(&address) {
            Some(node) => node
                .verify_integrity()
                .map_err(|source| SimulationError::ChainCorrupted {
                    node: address,
                    source,
                }),
            None => Ok(()),
        }
    }

    fn notify(&mut self, notification: Notification) {
        match &notification {
            Notification::NewsAccepted { .. } => self.stats.merges_accepted += 1,
            Notification::NewsRejected { node, author, reason } => {
                self.stats.merges_rejected += 1;
                debug!(node = %node, author = %author, reason, "Rejected news");
            }
            _ => {}
        }
        for sink in &mut self.sinks {
            sink.on_notification(self.now, &notification);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Channel
    // ═══════════════════════════════════════════════════════════════════════

    /// Turn a send intent into a local transmit attempt.
    fn request_send(&mut self, from: NodeAddress, target: Target, payload: Payload) {
        self.stats.sends_requested += 1;
        let at = self.now + self.channel.send_jitter(&mut self.rng);
        let key = self.sequence.key(at);
        self.local.schedule(
            key,
            SimEvent::Transmit {
                from,
                send: PendingSend {
                    target,
                    payload,
                    requested_at: self.now,
                },
            },
        );
    }

    fn transmit(&mut self, from: NodeAddress, send: PendingSend) {
        let Some(origin) = self.nodes.get(&from).map(|n| n.position()) else {
            trace!(node = from.0, "Sender removed before transmitting");
            return;
        };

        let next_reception = self.network.first_delivery_for(from).map(|(_, w)| w.arrival);
        match self
            .channel
            .decide(from, self.now, next_reception, &mut self.rng)
        {
            SendDecision::Defer { until, kind } => {
                self.stats.deferrals += 1;
                self.record_collision(from, kind);
                let key = self.sequence.key(until);
                self.local.schedule(key, SimEvent::Transmit { from, send });
            }
            SendDecision::Transmit => self.put_on_medium(from, origin, send),
        }
    }

    fn put_on_medium(&mut self, from: NodeAddress, origin: Position, send: PendingSend) {
        let end = self.channel.begin_transmission(from, self.now);
        self.stats.transmissions += 1;
        self.stats.bytes_transmitted += wire_size(&send.payload) as u64;

        let reference = self.next_wave;
        self.next_wave += 1;

        let receivers: Vec<(NodeAddress, Position)> = match send.target {
            Target::Unicast(to) => match self.nodes.get(&to) {
                Some(node) => vec![(to, node.position())],
                None => {
                    self.stats.record_drop(DropReason::Unreachable);
                    self.notify(Notification::Dropped {
                        from,
                        to,
                        kind: send.payload.kind,
                        reason: DropReason::Unreachable,
                    });
                    Vec::new()
                }
            },
            Target::Broadcast => self
                .nodes
                .values()
                .filter(|n| n.address() != from && self.channel.in_range(&origin, &n.position()))
                .map(|n| (n.address(), n.position()))
                .collect(),
        };

        trace!(
            node = from.0,
            kind = send.payload.kind.name(),
            reference,
            receivers = receivers.len(),
            until = %end,
            "Transmitting"
        );

        for (to, position) in receivers {
            let arrival = self.now + self.channel.propagation_delay(&origin, &position);
            let mut wave = Wave {
                source: from,
                destination: to,
                reference,
                payload: send.payload.clone(),
                sent_at: send.requested_at,
                arrival,
                received: true,
                drop_reason: None,
            };
            if self.channel.roll_loss(&mut self.rng) {
                wave.mark_dropped(DropReason::Loss);
            }
            let key = self.sequence.key(arrival);
            self.network.schedule(key, SimEvent::Deliver(Box::new(wave)));
            self.stats.deliveries_scheduled += 1;
        }
    }

    /// Resolve a reception at its destination.
    fn deliver(&mut self, mut wave: Wave) -> Result<(), SimulationError> {
        let to = wave.destination;

        if !self.nodes.contains_key(&to) {
            wave.mark_dropped(DropReason::Unreachable);
        } else if self.channel.config().receive_collisions {
            if self.channel.reception_collides_with_send(to, wave.arrival) {
                wave.mark_dropped(DropReason::Collision);
                self.record_collision(to, CollisionKind::ReceiveWhileSending);
            }
            let next = self
                .network
                .first_delivery_for(to)
                .map(|(key, next)| (key, next.arrival));
            if let Some((next_key, next_arrival)) = next {
                if self.channel.windows_collide(wave.arrival, next_arrival) {
                    wave.mark_dropped(DropReason::Collision);
                    if let Some(next) = self.network.wave_mut(&next_key) {
                        next.mark_dropped(DropReason::Collision);
                    }
                    self.record_collision(to, CollisionKind::OverlappingReceptions);
                }
            }
        }

        let kind = wave.payload.kind;
        if !wave.received {
            let reason = wave.drop_reason.unwrap_or(DropReason::Loss);
            self.stats.record_drop(reason);
            trace!(
                from = wave.source.0,
                to = to.0,
                reference = wave.reference,
                reason = reason.name(),
                "Delivery dropped"
            );
            self.notify(Notification::Dropped {
                from: wave.source,
                to,
                kind,
                reason,
            });
            return Ok(());
        }

        self.stats.messages_delivered += 1;
        self.notify(Notification::Delivered {
            from: wave.source,
            to,
            kind,
            sent_at: wave.sent_at,
            latency: wave.latency(),
        });
        self.handle_input(
            to,
            NodeInput::PayloadReceived {
                from: wave.source,
                payload: wave.payload,
            },
        )
    }

    fn record_collision(&mut self, node: NodeAddress, kind: CollisionKind) {
        self.stats.record_collision(kind);
        if self.config.channel.debug_collisions {
            info!(node = node.0, kind = kind.name(), time = %self.now, "Collision");
        } else {
            debug!(node = node.0, kind = kind.name(), time = %self.now, "Collision");
        }
        self.notify(Notification::Collision { node, kind });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Population and random processes
    // ═══════════════════════════════════════════════════════════════════════

    fn create_node(
        &mut self,
        initial: bool,
        position: Option<Position>,
    ) -> Result<Option<NodeAddress>, SimulationError> {
        if self.nodes.len() >= self.config.population.max_nodes {
            debug!(
                max_nodes = self.config.population.max_nodes,
                "Population full, not creating node"
            );
            return Ok(None);
        }

        let address = NodeAddress(self.next_address);
        self.next_address += 1;
        let position = match position {
            Some(position) => position,
            None => Position::new(self.rng.gen(), self.rng.gen()),
        };
        let keypair = KeyPair::from_rng(&mut self.rng);
        let gossip_offset = if initial {
            self.rng.gen_range(0.0..self.config.gossip.gossip_interval)
        } else {
            0.0
        };

        let mut node =
            NodeStateMachine::new(address, position, keypair, self.config.gossip.clone());
        node.set_time(self.now);
        let identity = *node.identity();
        let actions = node.initial_actions(gossip_offset);
        self.nodes.insert(address, node);
        self.stats.nodes_created += 1;

        info!(
            node = address.0,
            identity = %identity,
            x = position.x,
            y = position.y,
            time = %self.now,
            "Node created"
        );
        self.notify(Notification::NodeCreated { address, identity });
        self.process_actions(address, actions);

        if self.config.gossip.policy == PolicyKind::TransitiveInterest {
            self.initial_follows(address, identity)?;
        }
        Ok(Some(address))
    }

    /// A new node follows a few random existing identities.
    fn initial_follows(
        &mut self,
        address: NodeAddress,
        identity: Identity,
    ) -> Result<(), SimulationError> {
        let candidates: Vec<Identity> = self
            .nodes
            .values()
            .map(|n| *n.identity())
            .filter(|id| *id != identity)
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let min = self.config.gossip.min_followed;
        let max = self.config.gossip.max_followed;
        let count = self.rng.gen_range(min..=max).min(candidates.len());
        let targets: Vec<Identity> = candidates
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();
        for target in targets {
            self.stats.events_authored += 1;
            self.handle_input(
                address,
                NodeInput::Author {
                    content: Content::Follow(target),
                },
            )?;
        }
        Ok(())
    }

    fn kill_node(&mut self, target: Option<NodeAddress>) {
        let address = match target {
            Some(address) => address,
            None => {
                if self.nodes.len() <= self.config.population.min_nodes {
                    debug!(
                        min_nodes = self.config.population.min_nodes,
                        "Population at minimum, not killing"
                    );
                    return;
                }
                match self.random_node() {
                    Some(address) => address,
                    None => return,
                }
            }
        };

        let Some(node) = self.nodes.remove(&address) else {
            return;
        };
        self.channel.forget(address);
        self.timers.retain(|(owner, _), _| *owner != address);
        self.stats.nodes_killed += 1;

        let identity = *node.identity();
        info!(node = address.0, identity = %identity, time = %self.now, "Node killed");
        self.notify(Notification::NodeKilled { address, identity });
    }

    fn random_action(&mut self, kind: ProcessKind) -> Result<(), SimulationError> {
        let Some(address) = self.random_node() else {
            return Ok(());
        };
        let Some(content) = self.random_content(kind, address) else {
            trace!(node = address.0, process = kind.name(), "Nothing to do");
            return Ok(());
        };

        self.stats.actions_generated += 1;
        self.stats.events_authored += 1;
        self.handle_input(address, NodeInput::Author { content })
    }

    fn random_content(&mut self, kind: ProcessKind, address: NodeAddress) -> Option<Content> {
        let node = self.nodes.get(&address)?;
        let identity = *node.identity();
        let own_log = node.store().own_log();

        let pool: Vec<Identity> = match kind {
            ProcessKind::Follow | ProcessKind::Block => self
                .nodes
                .values()
                .map(|n| *n.identity())
                .filter(|id| *id != identity)
                .collect(),
            ProcessKind::Unfollow => own_log.followed().into_iter().collect(),
            ProcessKind::Unblock => own_log.blocked().into_iter().collect(),
            ProcessKind::Post => {
                self.post_counter += 1;
                return Some(Content::Post(format!(
                    "post #{} by {}",
                    self.post_counter,
                    identity.short()
                )));
            }
            ProcessKind::CreateNode | ProcessKind::KillNode => return None,
        };

        let target = *pool.choose(&mut self.rng)?;
        Some(match kind {
            ProcessKind::Follow => Content::Follow(target),
            ProcessKind::Block => Content::Block(target),
            ProcessKind::Unfollow => Content::Unfollow(target),
            _ => Content::Unblock(target),
        })
    }

    fn random_node(&mut self) -> Option<NodeAddress> {
        let addresses: Vec<NodeAddress> = self.nodes.keys().copied().collect();
        addresses.choose(&mut self.rng).copied()
    }

    fn random_peer(&mut self, from: NodeAddress) -> Option<NodeAddress> {
        let peers: Vec<NodeAddress> = self.nodes.keys().copied().filter(|a| *a != from).collect();
        peers.choose(&mut self.rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActionRates;
    use gossipsim_core::RecordingSink;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    fn quiet_config(initial_nodes: usize) -> SimulationConfig {
        SimulationConfig::default()
            .with_initial_nodes(initial_nodes)
            .with_actions(ActionRates::none())
            .with_stop_time(60.0)
    }

    #[traced_test]
    #[test]
    fn test_initial_population_is_created_at_zero() {
        let mut clock = SimulationClock::new(quiet_config(3)).unwrap();
        clock.run_until(SimTime::ZERO).unwrap();

        assert_eq!(clock.live_nodes(), 3);
        assert_eq!(clock.stats().nodes_created, 3);
        assert_eq!(clock.now(), SimTime::ZERO);
        assert!(logs_contain("Node created"));
    }

    #[test]
    fn test_population_cap() {
        let mut config = quiet_config(2);
        config.population.max_nodes = 2;
        let mut clock = SimulationClock::new(config).unwrap();
        clock.run_until(SimTime::ZERO).unwrap();

        assert_eq!(clock.spawn_node(None).unwrap(), None);
        assert_eq!(clock.live_nodes(), 2);
    }

    #[test]
    fn test_rearming_timer_replaces_pending_one() {
        let mut clock = SimulationClock::new(quiet_config(0)).unwrap();
        let node = clock.spawn_node(None).unwrap().unwrap();
        let pending = clock.local.len();

        clock.set_timer(node, TimerId::Gossip, 3.0);
        clock.set_timer(node, TimerId::Gossip, 4.0);
        assert_eq!(clock.local.len(), pending);

        let key = clock.timers[&(node, TimerId::Gossip)];
        assert_eq!(key.time, SimTime::from_secs(4.0));
    }

    #[test]
    fn test_random_kill_respects_minimum() {
        let mut config = quiet_config(2);
        config.population.min_nodes = 2;
        let mut clock = SimulationClock::new(config).unwrap();
        clock.run_until(SimTime::ZERO).unwrap();

        clock.kill_node(None);
        assert_eq!(clock.live_nodes(), 2);

        clock.kill_node(Some(NodeAddress(0)));
        assert_eq!(clock.live_nodes(), 1);
        assert_eq!(clock.stats().nodes_killed, 1);
    }

    #[test]
    fn test_delivery_to_removed_node_is_dropped_as_unreachable() {
        let mut clock = SimulationClock::new(quiet_config(0)).unwrap();
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        clock.add_sink(Box::new(sink.clone()));

        let a = clock.spawn_node(Some(Position::new(0.1, 0.1))).unwrap().unwrap();
        let b = clock.spawn_node(Some(Position::new(0.2, 0.1))).unwrap().unwrap();
        let payload = Payload::heartbeat(*clock.node(a).unwrap().identity());
        clock.put_on_medium(
            a,
            Position::new(0.1, 0.1),
            PendingSend {
                target: Target::Unicast(b),
                payload,
                requested_at: SimTime::ZERO,
            },
        );
        clock.kill_node(Some(b));
        clock.run_until(SimTime::from_secs(1.0)).unwrap();

        assert_eq!(clock.stats().dropped_unreachable, 1);
        assert!(sink.borrow().notifications.iter().any(|(_, n)| matches!(
            n,
            Notification::Dropped {
                reason: DropReason::Unreachable,
                ..
            }
        )));
    }

    #[test]
    fn test_overlapping_receptions_drop_both() {
        let mut config = quiet_config(0);
        config.channel = config.channel.with_transmission_time(0.5);
        let mut clock = SimulationClock::new(config).unwrap();
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        clock.add_sink(Box::new(sink.clone()));

        let a = clock.spawn_node(Some(Position::new(0.0, 0.0))).unwrap().unwrap();
        let b = clock.spawn_node(Some(Position::new(0.1, 0.0))).unwrap().unwrap();
        let c = clock.spawn_node(Some(Position::new(0.2, 0.0))).unwrap().unwrap();

        for (from, position) in [(a, Position::new(0.0, 0.0)), (c, Position::new(0.2, 0.0))] {
            let payload = Payload::heartbeat(*clock.node(from).unwrap().identity());
            clock.put_on_medium(
                from,
                position,
                PendingSend {
                    target: Target::Unicast(b),
                    payload,
                    requested_at: SimTime::ZERO,
                },
            );
        }
        // Both receptions at b end at 0.51 and fully overlap.
        clock.run_until(SimTime::from_secs(0.6)).unwrap();

        let sink = sink.borrow();
        let dropped_at_b = sink
            .notifications
            .iter()
            .filter(|(_, n)| {
                matches!(n, Notification::Dropped { to, reason: DropReason::Collision, .. } if *to == b)
            })
            .count();
        let overlaps_at_b = sink
            .notifications
            .iter()
            .filter(|(_, n)| {
                matches!(n, Notification::Collision { node, kind: CollisionKind::OverlappingReceptions } if *node == b)
            })
            .count();
        assert_eq!(dropped_at_b, 2);
        assert_eq!(overlaps_at_b, 1);
        assert!(!sink
            .notifications
            .iter()
            .any(|(_, n)| matches!(n, Notification::Delivered { to, .. } if *to == b)));
    }
}
