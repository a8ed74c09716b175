//! Test helpers for the gossip simulator - provides properly-signed fixtures.
//!
//! Fixtures carry real Ed25519 signatures and real hash links so tests
//! exercise the same verification paths as a running simulation.
//!
//! # Example
//!
//! ```rust
//! use gossipsim_test_helpers::{fixtures, TestCommunity};
//!
//! let community = TestCommunity::new(3, 7);
//! let chain = fixtures::make_signed_chain(community.keypair(0), 4);
//! assert_eq!(chain.len(), 4);
//! assert!(chain.iter().all(|e| e.verify_signature()));
//! ```

pub mod fixtures;

use gossipsim_types::{Identity, KeyPair};

pub use gossipsim_types::test_utils::{test_identity, test_keypair};

/// A set of participants with deterministic keypairs.
pub struct TestCommunity {
    keypairs: Vec<KeyPair>,
    identities: Vec<Identity>,
}

impl std::fmt::Debug for TestCommunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCommunity")
            .field("identities", &self.identities)
            .finish()
    }
}

impl TestCommunity {
    /// Create `size` members. Different seeds give disjoint communities.
    pub fn new(size: usize, seed: u64) -> Self {
        let mut keypairs = Vec::with_capacity(size);
        let mut identities = Vec::with_capacity(size);

        for i in 0..size {
            let mut seed_bytes = [0u8; 32];
            let key_seed = seed.wrapping_add(i as u64).wrapping_mul(0x517cc1b727220a95);
            seed_bytes[..8].copy_from_slice(&key_seed.to_le_bytes());
            seed_bytes[8..16].copy_from_slice(&(i as u64).to_le_bytes());
            seed_bytes[16..24].copy_from_slice(&seed.to_le_bytes());

            let keypair = KeyPair::from_seed(&seed_bytes);
            identities.push(Identity::from(keypair.public_key()));
            keypairs.push(keypair);
        }

        Self {
            keypairs,
            identities,
        }
    }

    pub fn size(&self) -> usize {
        self.keypairs.len()
    }

    /// # Panics
    ///
    /// Panics if `idx >= size()`.
    pub fn keypair(&self, idx: usize) -> &KeyPair {
        &self.keypairs[idx]
    }

    /// # Panics
    ///
    /// Panics if `idx >= size()`.
    pub fn identity(&self, idx: usize) -> Identity {
        self.identities[idx]
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }
}
