//! Core traits for state machines.

use crate::{Action, NodeInput};
use gossipsim_types::SimTime;

/// A state machine that processes node inputs.
///
/// Every simulated node is a state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + input = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine for NodeStateMachine {
///     fn handle(&mut self, input: NodeInput) -> Vec<Action> {
///         match input {
///             NodeInput::Timer(TimerId::Gossip) => self.gossip.on_gossip_timer(),
///             NodeInput::PayloadReceived { from, payload } => {
///                 self.gossip.on_payload(from, payload)
///             }
///             // ... etc
///         }
///     }
///
///     fn set_time(&mut self, now: SimTime) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an input, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and input, always returns the same actions
    /// - **No I/O**: All sends and timers are performed by the clock via the returned actions
    fn handle(&mut self, input: NodeInput) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the clock before each `handle()` call.
    fn set_time(&mut self, now: SimTime);

    /// Get the time that was last set via `set_time()`.
    fn now(&self) -> SimTime;
}
