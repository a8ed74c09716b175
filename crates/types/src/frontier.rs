//! Frontier: a compact summary of a store's knowledge.

use crate::Identity;
use sbor::prelude::*;
use std::collections::BTreeMap;

/// Mapping identity → last known log index.
///
/// `None` means the identity is known but its log is still empty, which
/// orders below any `Some(index)`. An identity missing from the map is
/// treated the same as `None` when comparing.
#[derive(Debug, Clone, Default, PartialEq, Eq, BasicSbor)]
#[sbor(transparent)]
pub struct Frontier(BTreeMap<Identity, Option<u64>>);

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the last index for an identity, replacing any previous entry.
    pub fn insert(&mut self, id: Identity, last_index: Option<u64>) {
        self.0.insert(id, last_index);
    }

    /// Whether the identity appears in the frontier at all.
    pub fn contains(&self, id: &Identity) -> bool {
        self.0.contains_key(id)
    }

    /// Last known index for an identity (`None` if absent or empty).
    pub fn last_index(&self, id: &Identity) -> Option<u64> {
        self.0.get(id).copied().flatten()
    }

    /// The first index the holder of this frontier is missing.
    pub fn next_index(&self, id: &Identity) -> u64 {
        self.last_index(id).map_or(0, |i| i + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &Option<u64>)> {
        self.0.iter()
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identities for which `self` knows strictly more than `other`.
    pub fn ahead_of<'a>(&'a self, other: &'a Frontier) -> impl Iterator<Item = &'a Identity> + 'a {
        self.0
            .iter()
            .filter(move |(id, last)| **last > other.last_index(id))
            .map(|(id, _)| id)
    }

    /// Total number of events summarised (sum of log lengths).
    pub fn total_events(&self) -> u64 {
        self.0.values().map(|last| last.map_or(0, |i| i + 1)).sum()
    }
}

impl FromIterator<(Identity, Option<u64>)> for Frontier {
    fn from_iter<I: IntoIterator<Item = (Identity, Option<u64>)>>(iter: I) -> Self {
        Frontier(iter.into_iter().collect())
    }
}
