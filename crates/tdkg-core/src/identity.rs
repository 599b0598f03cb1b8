//! Participant identities
//!
//! [`IdentityKey`] is what every party knows about every other party: a
//! public key that can be ordered, addressed and used to check signatures.
//! [`AuthKey`] is only held by the party itself and is the sole type that can
//! sign.

use crate::{Error, Result};
use rand_core::CryptoRngCore;
use std::cmp::Ordering;
use std::fmt::Debug;

/// Byte order used when sorting identity keys into sharing ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrdering {
    BigEndian,
    LittleEndian,
}

impl KeyOrdering {
    /// Compare two canonical encodings as unsigned integers
    pub fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            KeyOrdering::BigEndian => a.cmp(b),
            KeyOrdering::LittleEndian => a.iter().rev().cmp(b.iter().rev()),
        }
    }
}

/// Public identity of a participant
pub trait IdentityKey: Clone + Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Ordering family of this key type
    const ORDERING: KeyOrdering;

    /// Canonical byte encoding
    fn to_bytes(&self) -> Vec<u8>;

    /// Check `signature` over `message`
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()>;
}

/// Secret signing capability of a participant
pub trait AuthKey: Send + Sync {
    type Identity: IdentityKey;

    fn identity(&self) -> Self::Identity;

    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// secp256k1 ECDSA verifying key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secp256k1Identity(k256::ecdsa::VerifyingKey);

impl Secp256k1Identity {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl IdentityKey for Secp256k1Identity {
    const ORDERING: KeyOrdering = KeyOrdering::BigEndian;

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        use k256::ecdsa::{signature::Verifier, Signature};

        let signature = Signature::from_slice(signature)
            .map_err(|e| Error::VerificationFailed(e.to_string()))?;
        self.0
            .verify(message, &signature)
            .map_err(|e| Error::VerificationFailed(e.to_string()))
    }
}

/// secp256k1 ECDSA signing key
pub struct Secp256k1AuthKey(k256::ecdsa::SigningKey);

impl Secp256k1AuthKey {
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        Self(k256::ecdsa::SigningKey::random(rng))
    }
}

impl AuthKey for Secp256k1AuthKey {
    type Identity = Secp256k1Identity;

    fn identity(&self) -> Secp256k1Identity {
        Secp256k1Identity(*self.0.verifying_key())
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        use k256::ecdsa::{signature::Signer, Signature};

        let signature: Signature = self.0.sign(message);
        signature.to_bytes().to_vec()
    }
}

/// Ed25519 verifying key; sorted little-endian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ed25519Identity(ed25519_dalek::VerifyingKey);

impl Ed25519Identity {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Deserialization("Invalid ed25519 key length".into()))?;
        ed25519_dalek::VerifyingKey::from_bytes(&array)
            .map(Self)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl IdentityKey for Ed25519Identity {
    const ORDERING: KeyOrdering = KeyOrdering::LittleEndian;

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        use ed25519_dalek::{Signature, Verifier};

        let signature = Signature::from_slice(signature)
            .map_err(|e| Error::VerificationFailed(e.to_string()))?;
        self.0
            .verify(message, &signature)
            .map_err(|e| Error::VerificationFailed(e.to_string()))
    }
}

/// Ed25519 signing key
pub struct Ed25519AuthKey(ed25519_dalek::SigningKey);

impl Ed25519AuthKey {
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        let key = ed25519_dalek::SigningKey::from_bytes(&seed);
        zeroize::Zeroize::zeroize(&mut seed);
        Self(key)
    }
}

impl AuthKey for Ed25519AuthKey {
    type Identity = Ed25519Identity;

    fn identity(&self) -> Ed25519Identity {
        Ed25519Identity(self.0.verifying_key())
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        use ed25519_dalek::Signer;

        self.0.sign(message).to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_orderings_disagree() {
        let a = [0x01, 0x02];
        let b = [0x02, 0x01];
        assert_eq!(KeyOrdering::BigEndian.compare(&a, &b), Ordering::Less);
        assert_eq!(KeyOrdering::LittleEndian.compare(&a, &b), Ordering::Greater);
        assert_eq!(KeyOrdering::LittleEndian.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_secp256k1_sign_verify() {
        let key = Secp256k1AuthKey::generate(&mut OsRng);
        let identity = key.identity();
        let signature = key.sign(b"round 1");

        identity.verify(b"round 1", &signature).unwrap();
        assert!(identity.verify(b"round 2", &signature).is_err());
        assert!(identity.verify(b"round 1", &signature[1..]).is_err());

        let parsed = Secp256k1Identity::from_bytes(&identity.to_bytes()).unwrap();
        assert_eq!(parsed, identity);
    }

    #[test]
    fn test_ed25519_sign_verify() {
        let key = Ed25519AuthKey::generate(&mut OsRng);
        let identity = key.identity();
        let signature = key.sign(b"round 1");

        identity.verify(b"round 1", &signature).unwrap();
        assert!(identity.verify(b"round 2", &signature).is_err());

        let parsed = Ed25519Identity::from_bytes(&identity.to_bytes()).unwrap();
        assert_eq!(parsed, identity);
    }
}
