//! Event queue with deterministic ordering.

use gossipsim_types::SimTime;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key for ordering events.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (insertion order, unique across all schedulers)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: SimTime,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl EventKey {
    pub fn new(time: SimTime, sequence: u64) -> Self {
        Self { time, sequence }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Monotonic tie-break counter shared by every scheduler of a run.
#[derive(Debug, Default)]
pub struct Sequence(u64);

impl Sequence {
    pub fn new() -> Self {
        Self(0)
    }

    /// Key for an event at `time`, consuming the next sequence number.
    pub fn key(&mut self, time: SimTime) -> EventKey {
        let key = EventKey::new(time, self.0);
        self.0 += 1;
        key
    }

    /// Number of keys issued so far.
    pub fn issued(&self) -> u64 {
        self.0
    }
}

/// Ordered queue of timestamped entries.
#[derive(Debug)]
pub struct EventQueue<T> {
    entries: BTreeMap<EventKey, T>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EventKey, entry: T) {
        self.entries.insert(key, entry);
    }

    /// Earliest entry without removing it.
    pub fn peek(&self) -> Option<(&EventKey, &T)> {
        self.entries.first_key_value()
    }

    /// Remove and return the earliest entry.
    pub fn pop(&mut self) -> Option<(EventKey, T)> {
        self.entries.pop_first()
    }

    pub fn remove(&mut self, key: &EventKey) -> Option<T> {
        self.entries.remove(key)
    }

    pub fn get_mut(&mut self, key: &EventKey) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    pub fn get(&self, key: &EventKey) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_ordering() {
        let earlier = EventKey::new(SimTime::from_secs(1.0), 7);
        let later = EventKey::new(SimTime::from_secs(2.0), 1);
        assert!(earlier < later);
    }

    #[test]
    fn test_sequence_breaks_ties() {
        let mut sequence = Sequence::new();
        let t = SimTime::from_secs(5.0);
        let first = sequence.key(t);
        let second = sequence.key(t);
        assert!(first < second);
        assert_eq!(sequence.issued(), 2);
    }

    #[test]
    fn test_queue_pops_in_time_order_regardless_of_insertion() {
        let mut sequence = Sequence::new();
        let mut queue = EventQueue::new();
        queue.insert(sequence.key(SimTime::from_secs(3.0)), "c");
        queue.insert(sequence.key(SimTime::from_secs(1.0)), "a");
        queue.insert(sequence.key(SimTime::from_secs(3.0)), "d");
        queue.insert(sequence.key(SimTime::from_secs(2.0)), "b");

        assert_eq!(queue.peek().map(|(_, v)| *v), Some("a"));
        let order: Vec<_> = std::iter::from_fn(|| queue.pop().map(|(_, v)| v)).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert!(queue.is_empty());
    }
}
