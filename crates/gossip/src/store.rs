//! A node's local collection of logs.

use crate::log::{ChainError, Log, MergeError};
use gossipsim_types::{Content, Event, Frontier, Identity, KeyPair};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// A stored log failed re-verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("log of {author} is corrupted: {source}")]
pub struct IntegrityError {
    pub author: Identity,
    #[source]
    pub source: ChainError,
}

/// Outcome of applying a batch of news.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Events appended, per author, in first-seen order.
    pub accepted: Vec<(Identity, usize)>,
    /// Authors whose run was rejected, with the reason.
    pub rejected: Vec<(Identity, MergeError)>,
    /// Events dropped because the author is blocked or not of interest.
    pub unwanted: usize,
}

impl MergeReport {
    /// Total number of events appended.
    pub fn total_accepted(&self) -> usize {
        self.accepted.iter().map(|(_, n)| n).sum()
    }
}

/// Logs held by one node, plus the visibility sets derived from the owner's
/// own log.
///
/// The owner's log is created with the store and never evicted.
/// `blocked` and `transitive_followed` are kept disjoint.
#[derive(Debug, Clone)]
pub struct Store {
    owner: Identity,
    logs: BTreeMap<Identity, Log>,
    followed: BTreeSet<Identity>,
    blocked: BTreeSet<Identity>,
    transitive_followed: BTreeSet<Identity>,
}

impl Store {
    pub fn new(owner: Identity) -> Self {
        let mut logs = BTreeMap::new();
        logs.insert(owner, Log::new(owner));
        Self {
            owner,
            logs,
            followed: BTreeSet::new(),
            blocked: BTreeSet::new(),
            transitive_followed: BTreeSet::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn log(&self, id: &Identity) -> Option<&Log> {
        self.logs.get(id)
    }

    /// The owner's own log.
    pub fn own_log(&self) -> &Log {
        // Inserted in `new` and never evicted
        &self.logs[&self.owner]
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.logs.contains_key(id)
    }

    /// Identities with a log in this store.
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.logs.keys()
    }

    pub fn logs(&self) -> impl Iterator<Item = &Log> {
        self.logs.values()
    }

    /// Number of logs held.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Total events across all logs.
    pub fn event_count(&self) -> usize {
        self.logs.values().map(Log::len).sum()
    }

    pub fn followed(&self) -> &BTreeSet<Identity> {
        &self.followed
    }

    pub fn blocked(&self) -> &BTreeSet<Identity> {
        &self.blocked
    }

    pub fn transitive_followed(&self) -> &BTreeSet<Identity> {
        &self.transitive_followed
    }

    pub fn is_blocked(&self, id: &Identity) -> bool {
        self.blocked.contains(id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════════

    /// Append to the owner's log.
    pub fn append(&mut self, content: Content, keypair: &KeyPair) -> Event {
        let owner = self.owner;
        self.logs
            .entry(owner)
            .or_insert_with(|| Log::new(owner))
            .append(content, keypair)
            .clone()
    }

    /// Create an empty log for `id` if none is held. Returns whether one was created.
    pub fn ensure_log(&mut self, id: Identity) -> bool {
        if self.logs.contains_key(&id) {
            return false;
        }
        self.logs.insert(id, Log::new(id));
        true
    }

    /// Drop the log of `id`. The owner's log cannot be evicted.
    pub fn evict(&mut self, id: &Identity) -> Option<Log> {
        if *id == self.owner {
            return None;
        }
        self.logs.remove(id)
    }

    /// Replace the derived visibility sets.
    ///
    /// Blocked identities are removed from the transitive set and their logs
    /// evicted.
    pub fn set_visibility(
        &mut self,
        followed: BTreeSet<Identity>,
        blocked: BTreeSet<Identity>,
        mut transitive_followed: BTreeSet<Identity>,
    ) {
        transitive_followed.retain(|id| !blocked.contains(id));
        for id in &blocked {
            if self.evict(id).is_some() {
                debug!(owner = %self.owner, evicted = %id, "Evicted blocked log");
            }
        }
        self.followed = followed;
        self.blocked = blocked;
        self.transitive_followed = transitive_followed;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Replication
    // ═══════════════════════════════════════════════════════════════════════

    /// Fresh `{identity → last index}` for every held log.
    pub fn frontier(&self) -> Frontier {
        self.logs
            .iter()
            .map(|(id, log)| (*id, log.last_index()))
            .collect()
    }

    /// Frontier restricted to `ids`. Identities without a log are left out.
    pub fn frontier_for<'a>(&self, ids: impl IntoIterator<Item = &'a Identity>) -> Frontier {
        ids.into_iter()
            .filter_map(|id| self.logs.get(id).map(|log| (*id, log.last_index())))
            .collect()
    }

    /// Events held for `ids` that the holder of `peer` lacks.
    ///
    /// Identities absent from `peer` are only offered when `include_unlisted`
    /// is set, in which case their whole log is sent. Output is grouped by
    /// author in ascending index order.
    pub fn news_for<'a>(
        &self,
        peer: &Frontier,
        ids: impl IntoIterator<Item = &'a Identity>,
        include_unlisted: bool,
    ) -> Vec<Event> {
        let mut news = Vec::new();
        for id in ids {
            let Some(log) = self.logs.get(id) else {
                continue;
            };
            if !peer.contains(id) && !include_unlisted {
                continue;
            }
            news.extend_from_slice(log.since(peer.last_index(id)));
        }
        news
    }

    /// Merge a batch of remote events, grouped by author.
    ///
    /// `accepts` decides per author whether the events are wanted; blocked
    /// authors are always refused. A missing log is created only when the
    /// author's run starts at index 0; a run that is then rejected leaves no
    /// empty log behind.
    pub fn apply_news(
        &mut self,
        events: &[Event],
        accepts: impl Fn(&Store, &Identity) -> bool,
    ) -> MergeReport {
        let mut by_author: IndexMap<Identity, Vec<Event>> = IndexMap::new();
        for event in events {
            by_author.entry(event.author).or_default().push(event.clone());
        }

        let mut report = MergeReport::default();
        for (author, mut run) in by_author {
            if self.blocked.contains(&author) || !accepts(self, &author) {
                report.unwanted += run.len();
                continue;
            }
            run.sort_by_key(|e| e.index);

            let created = if self.logs.contains_key(&author) {
                false
            } else if run[0].index == 0 {
                self.logs.insert(author, Log::new(author));
                true
            } else {
                report.rejected.push((
                    author,
                    MergeError::NotContiguous {
                        expected: 0,
                        got: run[0].index,
                    },
                ));
                continue;
            };

            let Some(log) = self.logs.get_mut(&author) else {
                continue;
            };
            match log.merge(&run) {
                Ok(0) => {}
                Ok(count) => report.accepted.push((author, count)),
                Err(error) => {
                    debug!(owner = %self.owner, %author, %error, "Rejected news");
                    if created {
                        self.logs.remove(&author);
                    }
                    report.rejected.push((author, error));
                }
            }
        }
        report
    }

    /// Re-verify every held log.
    pub fn verify_integrity(&self) -> Result<(), IntegrityError> {
        for (author, log) in &self.logs {
            log.verify_chain().map_err(|source| IntegrityError {
                author: *author,
                source,
            })?;
        }
        Ok(())
    }

    /// Test-only access to a log's storage.
    #[cfg(test)]
    pub(crate) fn log_mut(&mut self, id: &Identity) -> Option<&mut Log> {
        self.logs.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_types::test_utils::{test_identity, test_keypair};

    fn store_with_posts(seed: u8, posts: u64) -> (Store, KeyPair) {
        let keypair = test_keypair(seed);
        let mut store = Store::new(Identity::from(keypair.public_key()));
        for i in 0..posts {
            store.append(Content::Post(format!("p{i}")), &keypair);
        }
        (store, keypair)
    }

    fn accept_all(_: &Store, _: &Identity) -> bool {
        true
    }

    #[test]
    fn test_new_store_holds_own_empty_log() {
        let store = Store::new(test_identity(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.frontier().last_index(&test_identity(1)), None);
        assert!(store.frontier().contains(&test_identity(1)));
    }

    #[test]
    fn test_frontier_reconciliation_catches_up() {
        let (remote, _) = store_with_posts(9, 6);
        let x = *remote.owner();

        let mut local = Store::new(test_identity(1));
        local.apply_news(&remote.own_log().events()[..3], accept_all);
        assert_eq!(local.frontier().last_index(&x), Some(2));

        // Peer advertises {X: 5}; local asks with its own frontier.
        let news = remote.news_for(&local.frontier(), [&x], false);
        assert_eq!(news.len(), 3);

        let before = local.frontier();
        let report = local.apply_news(&news, accept_all);
        assert_eq!(report.accepted, vec![(x, 3)]);
        assert_eq!(local.frontier().last_index(&x), Some(5));
        for (id, last) in before.iter() {
            assert!(local.frontier().last_index(id) >= *last);
        }
        assert!(local.verify_integrity().is_ok());
    }

    #[test]
    fn test_apply_news_creates_log_only_from_index_zero() {
        let (remote, _) = store_with_posts(9, 4);
        let x = *remote.owner();
        let mut local = Store::new(test_identity(1));

        let report = local.apply_news(&remote.own_log().events()[2..], accept_all);
        assert!(!local.contains(&x));
        assert_eq!(report.rejected.len(), 1);

        let report = local.apply_news(remote.own_log().events(), accept_all);
        assert_eq!(report.total_accepted(), 4);
        assert!(local.contains(&x));
    }

    #[test]
    fn test_rejected_first_run_leaves_no_empty_log() {
        let (remote, _) = store_with_posts(9, 2);
        let x = *remote.owner();
        let mut tampered = remote.own_log().events().to_vec();
        tampered[1].content = Content::Post("forged".into());

        let mut local = Store::new(test_identity(1));
        let report = local.apply_news(&tampered, accept_all);
        assert_eq!(report.rejected, vec![(x, MergeError::BadSignature { index: 1 })]);
        assert!(!local.contains(&x));
    }

    #[test]
    fn test_apply_news_respects_filter_and_blocks() {
        let (remote, _) = store_with_posts(9, 2);
        let x = *remote.owner();
        let mut local = Store::new(test_identity(1));

        let report = local.apply_news(remote.own_log().events(), |_, _| false);
        assert_eq!(report.unwanted, 2);

        local.set_visibility(BTreeSet::new(), BTreeSet::from([x]), BTreeSet::new());
        let report = local.apply_news(remote.own_log().events(), accept_all);
        assert_eq!(report.unwanted, 2);
        assert!(!local.contains(&x));
    }

    #[test]
    fn test_set_visibility_evicts_blocked_and_keeps_sets_disjoint() {
        let mut local = Store::new(test_identity(1));
        let x = test_identity(2);
        local.ensure_log(x);

        local.set_visibility(
            BTreeSet::from([x]),
            BTreeSet::from([x]),
            BTreeSet::from([x, test_identity(3)]),
        );

        assert!(!local.contains(&x));
        assert!(!local.transitive_followed().contains(&x));
        assert!(local.transitive_followed().contains(&test_identity(3)));
    }

    #[test]
    fn test_owner_log_is_never_evicted() {
        let mut local = Store::new(test_identity(1));
        assert!(local.evict(&test_identity(1)).is_none());
        local.set_visibility(
            BTreeSet::new(),
            BTreeSet::from([test_identity(1)]),
            BTreeSet::new(),
        );
        assert!(local.contains(&test_identity(1)));
    }

    #[test]
    fn test_news_for_unlisted_identities() {
        let (remote, _) = store_with_posts(9, 3);
        let x = *remote.owner();
        let empty = Frontier::new();

        assert!(remote.news_for(&empty, [&x], false).is_empty());
        assert_eq!(remote.news_for(&empty, [&x], true).len(), 3);
    }

    #[test]
    fn test_verify_integrity_reports_author() {
        let (mut store, _) = store_with_posts(9, 3);
        let owner = *store.owner();
        if let Some(log) = store.log_mut(&owner) {
            log.events_mut().remove(0);
        }

        let err = store.verify_integrity().unwrap_err();
        assert_eq!(err.author, owner);
    }
}
