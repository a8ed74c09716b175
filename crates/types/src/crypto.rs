//! Signing service consumed by the log layer.
//!
//! Ed25519 only: every identity is an Ed25519 verifying key and every log
//! event carries an Ed25519 signature over its domain-separated signing
//! message (see [`crate::signing`]). Key material never leaves [`KeyPair`].

use sbor::prelude::*;
use std::fmt;

/// An Ed25519 signing key.
#[derive(Clone)]
pub struct KeyPair(ed25519_dalek::SigningKey);

impl KeyPair {
    /// Build a keypair from a 32-byte seed (deterministic, for simulation).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        KeyPair(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// Draw a keypair from a seeded RNG so simulated identities are reproducible.
    pub fn from_rng<R: rand::RngCore>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message).to_bytes().to_vec())
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}

/// An Ed25519 verifying key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
#[sbor(transparent)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a signature. Malformed keys or signatures verify as `false`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        use ed25519_dalek::Verifier;
        let pk = match ed25519_dalek::VerifyingKey::from_bytes(&self.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let sig_array: [u8; 64] = match signature.0.as_slice().try_into() {
            Ok(arr) => arr,
            Err(_) => return false,
        };
        let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
        pk.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, BasicSbor)]
#[sbor(transparent)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Create a zero/placeholder signature for testing.
    pub fn zero() -> Self {
        Signature(vec![0u8; 64])
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "Signature({}..)", &hex[..hex.len().min(16)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = KeyPair::from_seed(&[7u8; 32]);
        let signature = keypair.sign(b"test message");

        assert!(keypair.public_key().verify(b"test message", &signature));
        assert!(!keypair.public_key().verify(b"wrong message", &signature));
    }

    #[test]
    fn test_verify_rejects_foreign_key_and_garbage() {
        let signer = KeyPair::from_seed(&[1u8; 32]);
        let other = KeyPair::from_seed(&[2u8; 32]);
        let signature = signer.sign(b"payload");

        assert!(!other.public_key().verify(b"payload", &signature));
        assert!(!signer.public_key().verify(b"payload", &Signature::zero()));
        assert!(!signer
            .public_key()
            .verify(b"payload", &Signature(vec![1, 2, 3])));
    }

    #[test]
    fn test_keypair_from_seed_is_deterministic() {
        let kp1 = KeyPair::from_seed(&[42u8; 32]);
        let kp2 = KeyPair::from_seed(&[42u8; 32]);

        assert_eq!(kp1.sign(b"test"), kp2.sign(b"test"));
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_keypair_from_rng_follows_seed() {
        use rand::SeedableRng;

        let mut first = rand::rngs::StdRng::seed_from_u64(9);
        let mut second = rand::rngs::StdRng::seed_from_u64(9);
        let a = KeyPair::from_rng(&mut first);
        assert_eq!(a.public_key(), KeyPair::from_rng(&mut second).public_key());
        assert_ne!(a.public_key(), KeyPair::from_rng(&mut first).public_key());
    }
}
