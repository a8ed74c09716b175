//! Deterministic discrete-event simulation of gossiping nodes.
//!
//! Given the same configuration and seed, a run produces the identical
//! sequence of dispatched events every time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   SimulationClock                       │
//! │                                                         │
//! │  ┌──────────┐ ┌──────────┐ ┌───────────────────────────┐│
//! │  │ network  │ │  local   │ │ on-demand generators      ││
//! │  │ (waves)  │ │ (timers, │ │ (create/kill node, post,  ││
//! │  │          │ │ transmit)│ │  follow, block, ...)      ││
//! │  └────┬─────┘ └────┬─────┘ └─────────────┬─────────────┘│
//! │       └────────────┼─────────────────────┘              │
//! │                    ▼ earliest (time, sequence)          │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  dispatch: simulation-level or NodeStateMachine    │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  Actions → Channel (defer / transmit / drop)       │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod channel;
mod clock;
mod config;
mod event;
mod event_queue;
mod scheduler;
mod stats;

pub use channel::{Channel, ChannelConfig, SendDecision};
pub use clock::{SimulationClock, SimulationError, TraceEntry};
pub use config::{ActionRates, ConfigError, PopulationConfig, SimulationConfig};
pub use event::{PendingSend, SimEvent, Target, Wave};
pub use event_queue::{EventKey, EventQueue, Sequence};
pub use scheduler::{
    OnDemandScheduler, ProcessKind, ProcessRate, QueuedScheduler, Scheduler, Tick,
};
pub use stats::SimulationStats;
