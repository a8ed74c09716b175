//! Signed fixture builders for logs and stores.

use gossipsim_gossip::{Log, Store};
use gossipsim_types::{Content, Event, Hash, Identity, KeyPair};

/// A valid chain of `len` posts authored by `keypair`, starting at index 0.
pub fn make_signed_chain(keypair: &KeyPair, len: u64) -> Vec<Event> {
    extend_signed_chain(keypair, &[], len)
}

/// `count` more posts continuing `existing` (which must be a valid chain).
pub fn extend_signed_chain(keypair: &KeyPair, existing: &[Event], count: u64) -> Vec<Event> {
    let mut previous = existing.last().map(Event::hash);
    let start = existing.last().map_or(0, |e| e.index + 1);

    (start..start + count)
        .map(|index| {
            let event = Event::signed(
                keypair,
                previous,
                index,
                Content::Post(format!("post {index}")),
            );
            previous = Some(event.hash());
            event
        })
        .collect()
}

/// A log of `keypair`'s identity holding `len` posts.
///
/// # Panics
///
/// Panics if the generated chain is rejected, which would be a bug in the
/// log itself.
pub fn make_log(keypair: &KeyPair, len: u64) -> Log {
    let mut log = Log::new(Identity::from(keypair.public_key()));
    log.merge(&make_signed_chain(keypair, len))
        .expect("fresh signed chain must merge");
    log
}

/// A store owned by `owner` that already replicated `len` posts of each peer.
pub fn make_store_with_peers(owner: &KeyPair, peers: &[(&KeyPair, u64)]) -> Store {
    let mut store = Store::new(Identity::from(owner.public_key()));
    for (peer, len) in peers {
        let report = store.apply_news(&make_signed_chain(peer, *len), |_, _| true);
        assert!(report.rejected.is_empty(), "fixture chain rejected");
    }
    store
}

/// Copy of `chain` with the link of `events[index]` pointing at garbage.
pub fn with_broken_link(chain: &[Event], index: usize) -> Vec<Event> {
    let mut events = chain.to_vec();
    events[index].previous = Some(Hash::from_bytes(b"not the previous event"));
    events
}

/// Copy of `chain` with `events[index]` re-signed by a different key.
pub fn with_foreign_signature(chain: &[Event], index: usize, forger: &KeyPair) -> Vec<Event> {
    let mut events = chain.to_vec();
    let original = &events[index];
    let forged = Event::signed(
        forger,
        original.previous,
        original.index,
        original.content.clone(),
    );
    events[index].signature = forged.signature;
    events
}
