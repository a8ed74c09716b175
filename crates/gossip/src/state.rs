//! Gossip protocol state machine.
//!
//! Each contact is a fresh negotiation; the only state carried across
//! rounds is the [`Store`] and the last frontier each peer reported.
//!
//! # Exchange modes
//!
//! ```text
//!  contact (heartbeat received)
//!      │
//!      ├── cached frontier of peer? ──► PUSHPULL (frontier + news)
//!      └── otherwise ─────────────────► PULL (frontier)
//!
//!  PULL received     ──► PUSHPULL if the requester is ahead, else PUSH if news
//!  PUSHPULL received ──► merge, then PUSH what the peer still lacks, or
//!                        PULL (PUSHPULL with news) if the peer is ahead on a
//!                        log it sent nothing for
//!  PUSH received     ──► merge
//! ```
//!
//! A round normally ends after three messages; a follow-up PULL adds two.

use crate::{GossipConfig, PolicyKind, ReplicationPolicy, Store};
use gossipsim_core::{Action, Notification, RelationshipKind, TimerId};
use gossipsim_messages::{Payload, PayloadKind};
use gossipsim_types::{Content, Event, Frontier, Identity, KeyPair, NodeAddress, SimTime};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Replication state of one identity.
pub struct GossipState {
    /// Identity authoring the local log.
    identity: Identity,

    /// Signing key for local events.
    keypair: KeyPair,

    /// Local logs and visibility sets.
    store: Store,

    /// Replication policy.
    policy: Box<dyn ReplicationPolicy>,

    /// Protocol parameters.
    config: GossipConfig,

    /// Last frontier each peer sent us.
    peer_frontiers: BTreeMap<Identity, Frontier>,

    /// Current simulation time.
    now: SimTime,
}

impl std::fmt::Debug for GossipState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipState")
            .field("identity", &self.identity)
            .field("policy", &self.policy.kind())
            .field("logs", &self.store.len())
            .field("events", &self.store.event_count())
            .finish()
    }
}

impl GossipState {
    /// Create the state for a freshly joined node.
    pub fn new(keypair: KeyPair, config: GossipConfig) -> Self {
        let identity = Identity::from(keypair.public_key());
        Self {
            identity,
            keypair,
            store: Store::new(identity),
            policy: config.policy.build(),
            config,
            peer_frontiers: BTreeMap::new(),
            now: SimTime::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Last frontier reported by `peer`, if any.
    pub fn peer_frontier(&self, peer: &Identity) -> Option<&Frontier> {
        self.peer_frontiers.get(peer)
    }

    pub fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════════

    /// Arm both timers. `gossip_offset` staggers the first PULL round.
    pub fn initial_actions(&self, gossip_offset: f64) -> Vec<Action> {
        vec![
            Action::SetTimer {
                id: TimerId::Gossip,
                delay: gossip_offset,
            },
            Action::SetTimer {
                id: TimerId::Heartbeat,
                delay: gossip_offset + self.config.heartbeat_interval,
            },
        ]
    }

    /// Start a PULL round with a random peer.
    pub fn on_gossip_timer(&mut self) -> Vec<Action> {
        let frontier = self.shareable_frontier();
        vec![
            Action::SendToRandomPeer {
                payload: Payload::pull(self.identity, frontier),
            },
            Action::SetTimer {
                id: TimerId::Gossip,
                delay: self.config.gossip_interval,
            },
        ]
    }

    /// Announce presence to everyone in range.
    pub fn on_heartbeat_timer(&mut self) -> Vec<Action> {
        vec![
            Action::Broadcast {
                payload: Payload::heartbeat(self.identity),
            },
            Action::SetTimer {
                id: TimerId::Heartbeat,
                delay: self.config.heartbeat_interval,
            },
        ]
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Payload Handling
    // ═══════════════════════════════════════════════════════════════════════════

    /// Handle a payload received from the node at `from`.
    pub fn on_payload(&mut self, from: NodeAddress, payload: Payload) -> Vec<Action> {
        if payload.sender == self.identity {
            return vec![];
        }

        trace!(
            node = %self.identity,
            peer = %payload.sender,
            kind = payload.kind.name(),
            news = payload.news.len(),
            "Payload received"
        );

        match payload.kind {
            PayloadKind::Heartbeat => self.on_contact(from, payload.sender),
            PayloadKind::Pull => self.on_pull(from, payload),
            PayloadKind::PushPull => self.on_push_pull(from, payload),
            PayloadKind::Push => {
                let mut actions = Vec::new();
                self.merge_news(&payload.news, &mut actions);
                actions
            }
        }
    }

    /// A peer came into contact: open a round.
    fn on_contact(&mut self, from: NodeAddress, peer: Identity) -> Vec<Action> {
        let frontier = self.shareable_frontier();
        let payload = match self.peer_frontiers.get(&peer) {
            Some(known) => {
                let news = self.news_for(known);
                Payload::push_pull(self.identity, frontier, news)
            }
            None => Payload::pull(self.identity, frontier),
        };
        vec![Action::SendTo { to: from, payload }]
    }

    fn on_pull(&mut self, from: NodeAddress, payload: Payload) -> Vec<Action> {
        let Some(theirs) = payload.frontier else {
            debug!(node = %self.identity, peer = %payload.sender, "PULL without frontier");
            return vec![];
        };

        let frontier = self.shareable_frontier();
        let news = self.news_for(&theirs);
        let mine = self.store.frontier();
        let requester_ahead = theirs
            .ahead_of(&mine)
            .any(|id| self.policy.accepts(&self.store, id) && !self.store.is_blocked(id));
        self.peer_frontiers.insert(payload.sender, theirs);

        let reply = if requester_ahead {
            Payload::push_pull(self.identity, frontier, news)
        } else if !news.is_empty() {
            Payload::push(self.identity, news)
        } else {
            return vec![];
        };
        vec![Action::SendTo { to: from, payload: reply }]
    }

    fn on_push_pull(&mut self, from: NodeAddress, payload: Payload) -> Vec<Action> {
        let mut actions = Vec::new();
        self.merge_news(&payload.news, &mut actions);

        let Some(theirs) = payload.frontier else {
            return actions;
        };
        self.policy.recompute(&mut self.store);
        let news = self.news_for(&theirs);
        let still_behind = self.behind_without_news(&theirs, &payload.news);
        self.peer_frontiers.insert(payload.sender, theirs);

        let reply = if still_behind {
            let frontier = self.shareable_frontier();
            if news.is_empty() {
                Payload::pull(self.identity, frontier)
            } else {
                Payload::push_pull(self.identity, frontier, news)
            }
        } else if !news.is_empty() {
            Payload::push(self.identity, news)
        } else {
            return actions;
        };
        actions.push(Action::SendTo { to: from, payload: reply });
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Local Authoring
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append locally authored content and re-run the policy immediately.
    pub fn author(&mut self, content: Content) -> Vec<Action> {
        let event = self.store.append(content, &self.keypair);
        if let Content::Follow(target) = &event.content {
            if *target != self.identity {
                self.store.ensure_log(*target);
            }
        }
        self.policy.recompute(&mut self.store);

        debug!(
            node = %self.identity,
            index = event.index,
            kind = event.content.kind_name(),
            "Authored event"
        );

        match RelationshipKind::of(&event.content) {
            Some((kind, target)) => vec![Action::Notify(Notification::Relationship {
                author: self.identity,
                target,
                kind,
            })],
            None => vec![],
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════════

    /// Policy decision followed by a fresh frontier of shareable logs.
    fn shareable_frontier(&mut self) -> Frontier {
        self.policy.recompute(&mut self.store);
        let ids = self.policy.shareable(&self.store);
        self.store.frontier_for(&ids)
    }

    /// Shareable events the holder of `peer` lacks.
    fn news_for(&self, peer: &Frontier) -> Vec<Event> {
        let ids = self.policy.shareable(&self.store);
        self.store.news_for(peer, &ids, self.policy.offers_unlisted())
    }

    /// Whether `theirs` is ahead on an accepted identity for which `news`
    /// carried nothing.
    fn behind_without_news(&self, theirs: &Frontier, news: &[Event]) -> bool {
        let mine = self.store.frontier();
        let behind = theirs.ahead_of(&mine).any(|id| {
            self.policy.accepts(&self.store, id)
                && !self.store.is_blocked(id)
                && !news.iter().any(|event| event.author == *id)
        });
        behind
    }

    fn merge_news(&mut self, news: &[Event], actions: &mut Vec<Action>) {
        if news.is_empty() {
            return;
        }
        let policy = &self.policy;
        let report = self
            .store
            .apply_news(news, |store, author| policy.accepts(store, author));

        for (author, count) in &report.accepted {
            actions.push(Action::Notify(Notification::NewsAccepted {
                node: self.identity,
                author: *author,
                count: *count,
            }));
        }
        for (author, error) in &report.rejected {
            actions.push(Action::Notify(Notification::NewsRejected {
                node: self.identity,
                author: *author,
                reason: error.to_string(),
            }));
        }
        if report.total_accepted() > 0 {
            self.policy.recompute(&mut self.store);
        }
    }
}
