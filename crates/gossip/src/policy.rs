//! Replication policies.
//!
//! A policy decides which identities a node holds, shares and accepts:
//!
//! - [`OpenGossip`]: replicate every identity ever observed, no filtering.
//! - [`TransitiveInterest`]: replicate followees and their followees, net of
//!   blocks.

use crate::Store;
use gossipsim_types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

/// Selects a policy from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    OpenGossip,
    TransitiveInterest,
}

impl PolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::OpenGossip => "open_gossip",
            PolicyKind::TransitiveInterest => "transitive_interest",
        }
    }

    /// Instantiate the policy.
    pub fn build(&self) -> Box<dyn ReplicationPolicy> {
        match self {
            PolicyKind::OpenGossip => Box::new(OpenGossip),
            PolicyKind::TransitiveInterest => Box::new(TransitiveInterest),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-node replication decisions.
pub trait ReplicationPolicy: fmt::Debug + Send {
    fn kind(&self) -> PolicyKind;

    /// Recompute the store's visibility sets from the owner's log, evicting
    /// and lazily creating logs as needed. Runs before every exchange and
    /// after every local authoring.
    fn recompute(&self, store: &mut Store);

    /// Identities whose logs may appear in an outgoing frontier or as news.
    fn shareable(&self, store: &Store) -> BTreeSet<Identity>;

    /// Whether incoming events of `author` should be merged.
    fn accepts(&self, store: &Store, author: &Identity) -> bool;

    /// Whether news may be pushed for identities the peer did not list.
    fn offers_unlisted(&self) -> bool;
}

/// Replicate everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGossip;

impl ReplicationPolicy for OpenGossip {
    fn kind(&self) -> PolicyKind {
        PolicyKind::OpenGossip
    }

    fn recompute(&self, _store: &mut Store) {}

    fn shareable(&self, store: &Store) -> BTreeSet<Identity> {
        store.identities().copied().collect()
    }

    fn accepts(&self, _store: &Store, _author: &Identity) -> bool {
        true
    }

    fn offers_unlisted(&self) -> bool {
        true
    }
}

/// Replicate followees and followees-of-followees, minus blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitiveInterest;

impl ReplicationPolicy for TransitiveInterest {
    fn kind(&self) -> PolicyKind {
        PolicyKind::TransitiveInterest
    }

    fn recompute(&self, store: &mut Store) {
        let owner = *store.owner();
        let own = store.own_log();
        let blocked = own.blocked();
        let mut followed = own.followed();
        followed.retain(|id| !blocked.contains(id) && *id != owner);

        let mut transitive = followed.clone();
        for id in &followed {
            let Some(log) = store.log(id) else {
                continue;
            };
            let their_blocked = log.blocked();
            transitive.extend(
                log.followed()
                    .into_iter()
                    .filter(|f| !their_blocked.contains(f) && !blocked.contains(f) && *f != owner),
            );
        }

        trace!(
            %owner,
            followed = followed.len(),
            blocked = blocked.len(),
            transitive = transitive.len(),
            "Recomputed visibility"
        );

        let wanted: Vec<Identity> = transitive.iter().copied().collect();
        store.set_visibility(followed, blocked, transitive);
        for id in wanted {
            store.ensure_log(id);
        }
    }

    fn shareable(&self, store: &Store) -> BTreeSet<Identity> {
        let mut ids = store.transitive_followed().clone();
        ids.insert(*store.owner());
        ids
    }

    fn accepts(&self, store: &Store, author: &Identity) -> bool {
        author == store.owner() || store.transitive_followed().contains(author)
    }

    fn offers_unlisted(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_types::test_utils::{test_identity, test_keypair};
    use gossipsim_types::{Content, KeyPair};

    fn store_for(seed: u8) -> (Store, KeyPair) {
        let keypair = test_keypair(seed);
        (Store::new(Identity::from(keypair.public_key())), keypair)
    }

    #[test]
    fn test_transitive_closure_includes_followees_of_followees() {
        let (mut me, my_key) = store_for(1);
        let (mut friend, friend_key) = store_for(2);
        let (b, c, d) = (test_identity(3), test_identity(4), test_identity(5));

        friend.append(Content::Follow(b), &friend_key);
        friend.append(Content::Follow(c), &friend_key);
        friend.append(Content::Block(c), &friend_key);
        me.append(Content::Follow(*friend.owner()), &my_key);
        me.append(Content::Block(d), &my_key);

        let policy = TransitiveInterest;
        policy.recompute(&mut me);
        let friend_events = friend.own_log().events().to_vec();
        me.apply_news(&friend_events, |s, a| policy.accepts(s, a));
        policy.recompute(&mut me);

        assert_eq!(me.followed(), &BTreeSet::from([*friend.owner()]));
        assert_eq!(
            me.transitive_followed(),
            &BTreeSet::from([*friend.owner(), b])
        );
        // Lazily created for the new transitive followee.
        assert!(me.contains(&b));
        assert!(!me.contains(&c));
    }

    #[test]
    fn test_block_evicts_and_removes_from_all_sets() {
        let (mut me, my_key) = store_for(1);
        let x = test_identity(7);
        let policy = TransitiveInterest;

        me.append(Content::Follow(x), &my_key);
        policy.recompute(&mut me);
        assert!(me.contains(&x));
        assert!(me.transitive_followed().contains(&x));

        me.append(Content::Block(x), &my_key);
        policy.recompute(&mut me);

        assert!(!me.contains(&x));
        assert!(!me.followed().contains(&x));
        assert!(!me.transitive_followed().contains(&x));
        assert!(me.blocked().contains(&x));
        assert!(!policy.accepts(&me, &x));
    }

    #[test]
    fn test_unblock_restores_interest() {
        let (mut me, my_key) = store_for(1);
        let x = test_identity(7);
        let policy = TransitiveInterest;

        me.append(Content::Follow(x), &my_key);
        me.append(Content::Block(x), &my_key);
        policy.recompute(&mut me);
        assert!(!me.contains(&x));

        me.append(Content::Unblock(x), &my_key);
        policy.recompute(&mut me);
        assert!(me.contains(&x));
        assert!(me.transitive_followed().contains(&x));
    }

    #[test]
    fn test_shareable_sets() {
        let (mut me, my_key) = store_for(1);
        let x = test_identity(7);
        let stranger = test_identity(8);
        me.append(Content::Follow(x), &my_key);
        me.ensure_log(stranger);

        let ti = TransitiveInterest;
        ti.recompute(&mut me);
        assert_eq!(ti.shareable(&me), BTreeSet::from([*me.owner(), x]));
        assert!(!ti.accepts(&me, &stranger));
        assert!(!ti.offers_unlisted());

        let open = OpenGossip;
        assert_eq!(open.shareable(&me).len(), 3);
        assert!(open.accepts(&me, &stranger));
        assert!(open.offers_unlisted());
    }

    #[test]
    fn test_open_gossip_never_evicts() {
        let (mut me, my_key) = store_for(1);
        let x = test_identity(7);
        me.ensure_log(x);
        me.append(Content::Block(x), &my_key);

        OpenGossip.recompute(&mut me);
        assert!(me.contains(&x));
        assert_eq!(PolicyKind::default().build().kind(), PolicyKind::OpenGossip);
    }
}
