//! Append-only, hash-chained log of one identity's events.

use gossipsim_types::{Content, Event, Hash, Identity, KeyPair};
use std::collections::BTreeSet;
use thiserror::Error;

/// Why a merge batch was rejected. A rejected batch leaves the log untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("expected index {expected}, got {got}")]
    NotContiguous { expected: u64, got: u64 },

    #[error("previous hash mismatch at index {index}")]
    BrokenChain { index: u64 },

    #[error("event at index {index} authored by {found}, log belongs to {expected}")]
    ForeignAuthor {
        index: u64,
        expected: Identity,
        found: Identity,
    },

    #[error("invalid signature at index {index}")]
    BadSignature { index: u64 },
}

/// Integrity violation found while re-verifying a stored log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("event at position {position} has index {index}")]
    IndexMismatch { position: usize, index: u64 },

    #[error("previous hash mismatch at index {index}")]
    BrokenLink { index: u64 },

    #[error("event at index {index} has a foreign author")]
    ForeignAuthor { index: u64 },

    #[error("invalid signature at index {index}")]
    BadSignature { index: u64 },
}

/// Ordered events of one author.
///
/// Grows only through [`Log::append`] (local authoring) or [`Log::merge`]
/// (a contiguous, hash-verified suffix from a peer). `events[i].index == i`
/// always holds.
#[derive(Debug, Clone)]
pub struct Log {
    author: Identity,
    events: Vec<Event>,
}

impl Log {
    /// Create an empty log.
    pub fn new(author: Identity) -> Self {
        Self {
            author,
            events: Vec::new(),
        }
    }

    pub fn author(&self) -> &Identity {
        &self.author
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the newest event, `None` while empty.
    pub fn last_index(&self) -> Option<u64> {
        self.events.last().map(|e| e.index)
    }

    /// Index the next event must carry.
    pub fn next_index(&self) -> u64 {
        self.events.len() as u64
    }

    /// Hash of the newest event.
    pub fn tail_hash(&self) -> Option<Hash> {
        self.events.last().map(Event::hash)
    }

    /// Events strictly after `after` (all events for `None`).
    pub fn since(&self, after: Option<u64>) -> &[Event] {
        let start = after.map_or(0, |i| i.saturating_add(1));
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        self.events.get(start..).unwrap_or(&[])
    }

    /// Author a new event at the tail.
    ///
    /// The keypair must belong to the log's author.
    pub fn append(&mut self, content: Content, keypair: &KeyPair) -> &Event {
        debug_assert_eq!(
            Identity::from(keypair.public_key()),
            self.author,
            "appending to a log with a foreign key"
        );
        let event = Event::signed(keypair, self.tail_hash(), self.next_index(), content);
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Merge a run of remote events.
    ///
    /// Events already held (index below [`Log::next_index`]) are skipped; the
    /// remainder must start exactly at `next_index`, be contiguous, chain to
    /// the current tail, belong to this author, and carry valid signatures.
    /// The whole remainder is applied or none of it is.
    ///
    /// Returns the number of events appended.
    pub fn merge(&mut self, events: &[Event]) -> Result<usize, MergeError> {
        let next = self.next_index();
        let fresh: Vec<&Event> = events.iter().filter(|e| e.index >= next).collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut expected = next;
        let mut previous = self.tail_hash();
        for event in &fresh {
            if event.author != self.author {
                return Err(MergeError::ForeignAuthor {
                    index: event.index,
                    expected: self.author,
                    found: event.author,
                });
            }
            if event.index != expected {
                return Err(MergeError::NotContiguous {
                    expected,
                    got: event.index,
                });
            }
            if event.previous != previous {
                return Err(MergeError::BrokenChain { index: event.index });
            }
            if !event.verify_signature() {
                return Err(MergeError::BadSignature { index: event.index });
            }
            previous = Some(event.hash());
            expected += 1;
        }

        let count = fresh.len();
        self.events.extend(fresh.into_iter().cloned());
        Ok(count)
    }

    /// Re-verify the whole chain.
    pub fn verify_chain(&self) -> Result<(), ChainError> {
        let mut previous: Option<Hash> = None;
        for (position, event) in self.events.iter().enumerate() {
            if event.index != position as u64 {
                return Err(ChainError::IndexMismatch {
                    position,
                    index: event.index,
                });
            }
            if event.author != self.author {
                return Err(ChainError::ForeignAuthor { index: event.index });
            }
            if event.previous != previous {
                return Err(ChainError::BrokenLink { index: event.index });
            }
            if !event.verify_signature() {
                return Err(ChainError::BadSignature { index: event.index });
            }
            previous = Some(event.hash());
        }
        Ok(())
    }

    /// Identities currently followed according to this log.
    pub fn followed(&self) -> BTreeSet<Identity> {
        self.replay(
            |c| matches!(c, Content::Follow(_)),
            |c| matches!(c, Content::Unfollow(_)),
        )
    }

    /// Identities currently blocked according to this log.
    pub fn blocked(&self) -> BTreeSet<Identity> {
        self.replay(
            |c| matches!(c, Content::Block(_)),
            |c| matches!(c, Content::Unblock(_)),
        )
    }

    fn replay(
        &self,
        adds: impl Fn(&Content) -> bool,
        removes: impl Fn(&Content) -> bool,
    ) -> BTreeSet<Identity> {
        let mut set = BTreeSet::new();
        for event in &self.events {
            let Some(target) = event.content.target() else {
                continue;
            };
            if adds(&event.content) {
                set.insert(*target);
            } else if removes(&event.content) {
                set.remove(target);
            }
        }
        set
    }

    /// Replace the stored events. Test-only hook for corrupting a chain.
    #[cfg(test)]
    pub(crate) fn events_mut(&mut self) -> &mut Vec<Event> {
        &mut self.events
    }
}
