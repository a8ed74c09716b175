//! Event sources merged by the clock.
//!
//! A [`Scheduler`] is either a continuous queue filled by the clock itself
//! ([`QueuedScheduler`]: channel deliveries, timers, transmit attempts) or an
//! on-demand generator ([`OnDemandScheduler`]) that draws its next event from
//! a random process each time it is refreshed and has nothing pending.

use crate::event::{SimEvent, Wave};
use crate::event_queue::{EventKey, EventQueue, Sequence};
use crate::SimulationConfig;
use gossipsim_types::{NodeAddress, SimTime};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Context handed to [`Scheduler::refresh`] once per clock step.
pub struct Tick<'a> {
    /// Time of the last processed event.
    pub now: SimTime,
    pub rng: &'a mut ChaCha8Rng,
    /// Shared tie-break counter; every key must come from here.
    pub sequence: &'a mut Sequence,
}

/// A source of timestamped events.
pub trait Scheduler {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Earliest pending event.
    fn peek(&self) -> Option<(&EventKey, &SimEvent)>;

    /// Remove and return the earliest pending event.
    fn pop(&mut self) -> Option<(EventKey, SimEvent)>;

    /// Called before every step so generators can produce their next event.
    fn refresh(&mut self, tick: &mut Tick<'_>);

    /// Number of pending events.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick up a reloaded configuration.
    fn reconfigure(&mut self, _config: &SimulationConfig) {}
}

// ═══════════════════════════════════════════════════════════════════════════
// Queued scheduler
// ═══════════════════════════════════════════════════════════════════════════

/// Continuous queue filled by the clock.
///
/// Pending deliveries are also indexed by destination so the channel can
/// find a node's next reception without scanning the queue.
#[derive(Debug)]
pub struct QueuedScheduler {
    name: &'static str,
    queue: EventQueue<SimEvent>,
    deliveries: BTreeMap<NodeAddress, BTreeSet<EventKey>>,
}

impl QueuedScheduler {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            queue: EventQueue::new(),
            deliveries: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, key: EventKey, event: SimEvent) {
        if let SimEvent::Deliver(wave) = &event {
            self.deliveries
                .entry(wave.destination)
                .or_default()
                .insert(key);
        }
        self.queue.insert(key, event);
    }

    pub fn remove(&mut self, key: &EventKey) -> Option<SimEvent> {
        let event = self.queue.remove(key)?;
        self.unindex(key, &event);
        Some(event)
    }

    /// Earliest pending delivery addressed to `destination`.
    pub fn first_delivery_for(&self, destination: NodeAddress) -> Option<(EventKey, &Wave)> {
        let key = self.deliveries.get(&destination)?.first()?;
        match self.queue.get(key) {
            Some(SimEvent::Deliver(wave)) => Some((*key, &**wave)),
            _ => None,
        }
    }

    fn unindex(&mut self, key: &EventKey, event: &SimEvent) {
        let SimEvent::Deliver(wave) = event else {
            return;
        };
        if let Some(keys) = self.deliveries.get_mut(&wave.destination) {
            keys.remove(key);
            if keys.is_empty() {
                self.deliveries.remove(&wave.destination);
            }
        }
    }

    /// Pending delivery by key, for marking.
    pub fn wave_mut(&mut self, key: &EventKey) -> Option<&mut Wave> {
        match self.queue.get_mut(key) {
            Some(SimEvent::Deliver(wave)) => Some(&mut **wave),
            _ => None,
        }
    }
}

impl Scheduler for QueuedScheduler {
    fn name(&self) -> &'static str {
        self.name
    }

    fn peek(&self) -> Option<(&EventKey, &SimEvent)> {
        self.queue.peek()
    }

    fn pop(&mut self) -> Option<(EventKey, SimEvent)> {
        let (key, event) = self.queue.pop()?;
        self.unindex(&key, &event);
        Some((key, event))
    }

    fn refresh(&mut self, _tick: &mut Tick<'_>) {}

    fn len(&self) -> usize {
        self.queue.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Random processes
// ═══════════════════════════════════════════════════════════════════════════

/// Random process driven by an [`OnDemandScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessKind {
    CreateNode,
    KillNode,
    Post,
    Follow,
    Unfollow,
    Block,
    Unblock,
}

impl ProcessKind {
    pub const ALL: [ProcessKind; 7] = [
        ProcessKind::CreateNode,
        ProcessKind::KillNode,
        ProcessKind::Post,
        ProcessKind::Follow,
        ProcessKind::Unfollow,
        ProcessKind::Block,
        ProcessKind::Unblock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProcessKind::CreateNode => "CreateNodeProcess",
            ProcessKind::KillNode => "KillNodeProcess",
            ProcessKind::Post => "RandomPost",
            ProcessKind::Follow => "RandomFollow",
            ProcessKind::Unfollow => "RandomUnfollow",
            ProcessKind::Block => "RandomBlock",
            ProcessKind::Unblock => "RandomUnblock",
        }
    }

    /// Event produced each time the process fires.
    pub fn event(&self) -> SimEvent {
        match self {
            ProcessKind::CreateNode => SimEvent::CreateNode { initial: false },
            ProcessKind::KillNode => SimEvent::KillNode { target: None },
            other => SimEvent::RandomAction(*other),
        }
    }

    /// The configured rate of this process.
    pub fn rate(&self, config: &SimulationConfig) -> ProcessRate {
        match self {
            ProcessKind::CreateNode => config.population.create,
            ProcessKind::KillNode => config.population.kill,
            ProcessKind::Post => config.actions.post,
            ProcessKind::Follow => config.actions.follow,
            ProcessKind::Unfollow => config.actions.unfollow,
            ProcessKind::Block => config.actions.block,
            ProcessKind::Unblock => config.actions.unblock,
        }
    }
}

/// Inter-arrival time distribution of a random process, in seconds.
///
/// Delays are normal with the given mean and variance, truncated at zero.
/// A mean of zero disables the process.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessRate {
    pub mean: f64,
    pub variance: f64,
}

impl ProcessRate {
    pub const DISABLED: Self = ProcessRate {
        mean: 0.0,
        variance: 0.0,
    };

    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    pub fn is_enabled(&self) -> bool {
        self.mean > 0.0
    }

    /// Draw one inter-arrival delay.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> f64 {
        if self.variance <= 0.0 {
            return self.mean.max(0.0);
        }
        (self.mean + self.variance.sqrt() * standard_normal(rng)).max(0.0)
    }
}

/// Box-Muller transform.
fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    // 1 - [0, 1) keeps ln() away from zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Generator holding at most one pending event of its process.
#[derive(Debug)]
pub struct OnDemandScheduler {
    kind: ProcessKind,
    rate: ProcessRate,
    pending: Option<(EventKey, SimEvent)>,
}

impl OnDemandScheduler {
    pub fn new(kind: ProcessKind, rate: ProcessRate) -> Self {
        Self {
            kind,
            rate,
            pending: None,
        }
    }

    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    pub fn rate(&self) -> ProcessRate {
        self.rate
    }
}

impl Scheduler for OnDemandScheduler {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn peek(&self) -> Option<(&EventKey, &SimEvent)> {
        self.pending.as_ref().map(|(key, event)| (key, event))
    }

    fn pop(&mut self) -> Option<(EventKey, SimEvent)> {
        self.pending.take()
    }

    fn refresh(&mut self, tick: &mut Tick<'_>) {
        if self.pending.is_some() || !self.rate.is_enabled() {
            return;
        }
        let delay = self.rate.sample(tick.rng);
        let key = tick.sequence.key(tick.now + delay);
        self.pending = Some((key, self.kind.event()));
    }

    fn len(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    fn reconfigure(&mut self, config: &SimulationConfig) {
        self.rate = self.kind.rate(config);
        if !self.rate.is_enabled() {
            self.pending = None;
        }
    }
}
