//! Gossip round payloads.

use gossipsim_types::{Event, Frontier, Identity};
use sbor::prelude::BasicSbor;

/// Exchange mode of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
pub enum PayloadKind {
    /// News only.
    Push,
    /// Frontier plus the news the sender already knows the peer lacks.
    PushPull,
    /// Frontier only: "send me what I am missing".
    Pull,
    /// Presence only; triggers a round at the receiver.
    Heartbeat,
}

impl PayloadKind {
    pub fn name(&self) -> &'static str {
        match self {
            PayloadKind::Push => "PUSH",
            PayloadKind::PushPull => "PUSHPULL",
            PayloadKind::Pull => "PULL",
            PayloadKind::Heartbeat => "HEARTBEAT",
        }
    }
}

/// The message body exchanged between two nodes during a gossip round.
///
/// `news` is ordered per author by ascending index so a receiver can merge
/// each author's run directly.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Payload {
    /// Identity of the sending node.
    pub sender: Identity,
    /// Exchange mode.
    pub kind: PayloadKind,
    /// Sender's (shareable) frontier. Present for PULL and PUSHPULL.
    pub frontier: Option<Frontier>,
    /// Events the receiver is believed to be missing.
    pub news: Vec<Event>,
}

impl Payload {
    pub fn push(sender: Identity, news: Vec<Event>) -> Self {
        Self {
            sender,
            kind: PayloadKind::Push,
            frontier: None,
            news,
        }
    }

    pub fn pull(sender: Identity, frontier: Frontier) -> Self {
        Self {
            sender,
            kind: PayloadKind::Pull,
            frontier: Some(frontier),
            news: Vec::new(),
        }
    }

    pub fn push_pull(sender: Identity, frontier: Frontier, news: Vec<Event>) -> Self {
        Self {
            sender,
            kind: PayloadKind::PushPull,
            frontier: Some(frontier),
            news,
        }
    }

    pub fn heartbeat(sender: Identity) -> Self {
        Self {
            sender,
            kind: PayloadKind::Heartbeat,
            frontier: None,
            news: Vec::new(),
        }
    }

    /// Whether the payload carries any events.
    pub fn has_news(&self) -> bool {
        !self.news.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_types::test_utils::test_identity;

    #[test]
    fn test_constructors_set_kind_and_fields() {
        let me = test_identity(1);

        let pull = Payload::pull(me, Frontier::new());
        assert_eq!(pull.kind, PayloadKind::Pull);
        assert!(pull.frontier.is_some());
        assert!(!pull.has_news());

        let push = Payload::push(me, Vec::new());
        assert_eq!(push.kind, PayloadKind::Push);
        assert!(push.frontier.is_none());

        let heartbeat = Payload::heartbeat(me);
        assert_eq!(heartbeat.kind.name(), "HEARTBEAT");
        assert!(heartbeat.frontier.is_none());
    }
}
