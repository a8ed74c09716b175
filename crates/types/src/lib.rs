//! Core types for the gossip simulator.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - **Primitives**: [`Hash`], [`KeyPair`], [`PublicKey`], [`Signature`]
//! - **Identifiers**: [`Identity`], [`NodeAddress`]
//! - **Time**: [`SimTime`], the totally ordered simulated clock value
//! - **Log data**: [`Event`], [`Content`], [`Frontier`]
//!
//! Signatures are always computed over the domain-separated messages in
//! [`signing`].

mod crypto;
mod event;
mod frontier;
mod hash;
mod identifiers;
pub mod signing;
mod time;

pub use crypto::{KeyPair, PublicKey, Signature};
pub use event::{Content, Event};
pub use frontier::Frontier;
pub use hash::{Hash, HexError};
pub use identifiers::{Identity, NodeAddress};
pub use time::SimTime;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    //! Deterministic constructors for tests.

    use super::*;

    /// Keypair derived from a single seed byte.
    pub fn test_keypair(seed: u8) -> KeyPair {
        KeyPair::from_seed(&[seed; 32])
    }

    /// Identity of [`test_keypair`] for the same seed.
    pub fn test_identity(seed: u8) -> Identity {
        Identity::from(test_keypair(seed).public_key())
    }
}
