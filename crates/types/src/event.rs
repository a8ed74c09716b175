//! Log events and their content.

use crate::signing::log_event_message;
use crate::{Hash, Identity, KeyPair, Signature};
use sbor::prelude::*;

/// What an event says.
///
/// `Post` is opaque application data; the relationship variants drive the
/// visibility sets of the transitive-interest policy.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub enum Content {
    /// Free-form application payload.
    Post(String),
    /// Start replicating `target` (and, transitively, whom it follows).
    Follow(Identity),
    /// Stop following `target`.
    Unfollow(Identity),
    /// Never replicate `target`; evict its log.
    Block(Identity),
    /// Lift an earlier block.
    Unblock(Identity),
}

impl Content {
    /// The identity a relationship event refers to, if any.
    pub fn target(&self) -> Option<&Identity> {
        match self {
            Content::Post(_) => None,
            Content::Follow(id)
            | Content::Unfollow(id)
            | Content::Block(id)
            | Content::Unblock(id) => Some(id),
        }
    }

    /// Short name for logs and telemetry.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Content::Post(_) => "post",
            Content::Follow(_) => "follow",
            Content::Unfollow(_) => "unfollow",
            Content::Block(_) => "block",
            Content::Unblock(_) => "unblock",
        }
    }

    /// Stable byte encoding covered by the event signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let (tag, body): (u8, &[u8]) = match self {
            Content::Post(text) => (0, text.as_bytes()),
            Content::Follow(id) => (1, id.public_key().as_bytes()),
            Content::Unfollow(id) => (2, id.public_key().as_bytes()),
            Content::Block(id) => (3, id.public_key().as_bytes()),
            Content::Unblock(id) => (4, id.public_key().as_bytes()),
        };
        let mut bytes = Vec::with_capacity(1 + body.len());
        bytes.push(tag);
        bytes.extend_from_slice(body);
        bytes
    }
}

/// One immutable entry of an identity's append-only log.
///
/// `index` is 0 for the first event and grows by one; `previous` is the
/// [`Event::hash`] of the preceding event (absent for index 0).
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Event {
    /// Identity that authored and signed the event.
    pub author: Identity,
    /// Hash of the preceding event in the same log.
    pub previous: Option<Hash>,
    /// Position in the author's log.
    pub index: u64,
    /// Event body.
    pub content: Content,
    /// Author's signature over [`Event::signing_message`].
    pub signature: Signature,
}

impl Event {
    /// Build and sign a new event. The author is taken from the keypair.
    pub fn signed(
        keypair: &KeyPair,
        previous: Option<Hash>,
        index: u64,
        content: Content,
    ) -> Self {
        let author = Identity::from(keypair.public_key());
        let message = log_event_message(&author, previous.as_ref(), index, &content.signing_bytes());
        let signature = keypair.sign(&message);
        Self {
            author,
            previous,
            index,
            content,
            signature,
        }
    }

    /// The bytes the author signed.
    pub fn signing_message(&self) -> Vec<u8> {
        log_event_message(
            &self.author,
            self.previous.as_ref(),
            self.index,
            &self.content.signing_bytes(),
        )
    }

    /// Check the signature against the author's key.
    pub fn verify_signature(&self) -> bool {
        self.author
            .public_key()
            .verify(&self.signing_message(), &self.signature)
    }

    /// Hash linking the next event to this one. Covers the signature so a
    /// re-signed event produces a different link.
    pub fn hash(&self) -> Hash {
        Hash::from_parts(&[&self.signing_message(), self.signature.as_bytes()])
    }
}
