//! Core types for the gossip simulator.
//!
//! Every node is a [`StateMachine`]: it receives [`NodeInput`]s from the
//! simulation clock and answers with [`Action`]s. The clock performs the
//! actions (channel sends, timers, telemetry) so nodes never touch each
//! other or the clock directly.

mod action;
mod input;
mod notification;
mod timer;
mod traits;

pub use action::Action;
pub use input::NodeInput;
pub use notification::{
    CollisionKind, DropReason, Notification, RecordingSink, RelationshipKind, TelemetrySink,
};
pub use timer::TimerId;
pub use traits::StateMachine;
