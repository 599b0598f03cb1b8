//! Signed message envelopes
//!
//! Every message handed to a [`Relay`](super::Relay) is wrapped in an
//! [`Envelope`] signed by the sender's [`AuthKey`]. The signature covers the
//! session, the round, both endpoints and the payload, so a relay can neither
//! forge nor redirect messages.

use crate::identity::{AuthKey, IdentityKey};
use crate::sharing::SharingConfig;
use crate::{Error, Result, SharingId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Sender sharing id
    pub from: SharingId,
    pub payload: T,
    pub signature: Vec<u8>,
}

/// Digest every envelope signature covers. `to` is `None` for broadcasts.
pub fn envelope_digest(
    session_id: &[u8],
    round: u32,
    from: SharingId,
    to: Option<SharingId>,
    payload: &[u8],
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"tdkg-envelope-v1");
    hasher.update(&(session_id.len() as u64).to_le_bytes());
    hasher.update(session_id);
    hasher.update(&round.to_le_bytes());
    hasher.update(&(from as u64).to_le_bytes());
    match to {
        Some(to) => {
            hasher.update(&[1]);
            hasher.update(&(to as u64).to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.update(payload);
    *hasher.finalize().as_bytes()
}

/// Sign `payload` as sharing id `from`
pub fn seal<A: AuthKey, T: Serialize>(
    auth_key: &A,
    session_id: &[u8],
    round: u32,
    from: SharingId,
    to: Option<SharingId>,
    payload: T,
) -> Result<Envelope<T>> {
    let bytes = serde_json::to_vec(&payload)?;
    let digest = envelope_digest(session_id, round, from, to, &bytes);
    Ok(Envelope {
        from,
        signature: auth_key.sign(&digest),
        payload,
    })
}

/// Check the signature of one envelope against the sender's configured key
pub fn open<I: IdentityKey, T: Serialize>(
    sharing: &SharingConfig<I>,
    session_id: &[u8],
    round: u32,
    to: Option<SharingId>,
    envelope: &Envelope<T>,
) -> Result<()> {
    let sender = sharing.identity(envelope.from).ok_or_else(|| {
        Error::Relay(format!("Envelope from unknown sharing id {}", envelope.from))
    })?;
    let bytes = serde_json::to_vec(&envelope.payload)?;
    let digest = envelope_digest(session_id, round, envelope.from, to, &bytes);
    sender.verify(&digest, &envelope.signature).map_err(|_| {
        Error::Relay(format!(
            "Bad envelope signature claiming sharing id {}",
            envelope.from
        ))
    })
}

/// Open a batch of envelopes, dropping the caller's own and keying the rest
/// by sender. Every other party must appear exactly once.
pub fn open_all<I: IdentityKey, T: Serialize>(
    sharing: &SharingConfig<I>,
    session_id: &[u8],
    round: u32,
    me: SharingId,
    to: Option<SharingId>,
    envelopes: Vec<Envelope<T>>,
) -> Result<BTreeMap<SharingId, T>> {
    let mut opened = BTreeMap::new();
    for envelope in envelopes {
        if envelope.from == me {
            continue;
        }
        open(sharing, session_id, round, to, &envelope)?;
        if opened.insert(envelope.from, envelope.payload).is_some() {
            return Err(Error::Relay(format!(
                "Duplicate round {} message from sharing id {}",
                round, envelope.from
            )));
        }
    }
    Ok(opened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Secp256k1AuthKey;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn cohort() -> (Vec<Secp256k1AuthKey>, SharingConfig<crate::identity::Secp256k1Identity>) {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let keys: Vec<_> = (0..3).map(|_| Secp256k1AuthKey::generate(&mut rng)).collect();
        let identities: Vec<_> = keys.iter().map(|k| k.identity()).collect();
        let sharing = SharingConfig::derive(&identities).unwrap();
        (keys, sharing)
    }

    fn key_for<'a>(
        keys: &'a [Secp256k1AuthKey],
        sharing: &SharingConfig<crate::identity::Secp256k1Identity>,
        id: SharingId,
    ) -> &'a Secp256k1AuthKey {
        let identity = sharing.identity(id).unwrap();
        keys.iter().find(|k| &k.identity() == identity).unwrap()
    }

    #[test]
    fn test_digest_separates_fields() {
        let base = envelope_digest(b"sid", 1, 1, None, b"payload");
        assert_ne!(base, envelope_digest(b"sid2", 1, 1, None, b"payload"));
        assert_ne!(base, envelope_digest(b"sid", 2, 1, None, b"payload"));
        assert_ne!(base, envelope_digest(b"sid", 1, 2, None, b"payload"));
        assert_ne!(base, envelope_digest(b"sid", 1, 1, Some(2), b"payload"));
        assert_eq!(base, envelope_digest(b"sid", 1, 1, None, b"payload"));
    }

    #[test]
    fn test_seal_open() {
        let (keys, sharing) = cohort();
        let envelope = seal(key_for(&keys, &sharing, 2), b"sid", 1, 2, Some(3), 42u32).unwrap();

        open(&sharing, b"sid", 1, Some(3), &envelope).unwrap();
        assert!(open(&sharing, b"sid", 1, Some(1), &envelope).is_err());
        assert!(open(&sharing, b"other", 1, Some(3), &envelope).is_err());

        let mut impersonated = envelope.clone();
        impersonated.from = 1;
        assert!(open(&sharing, b"sid", 1, Some(3), &impersonated).is_err());

        let mut altered = envelope;
        altered.payload = 43;
        assert!(open(&sharing, b"sid", 1, Some(3), &altered).is_err());
    }

    #[test]
    fn test_open_all() {
        let (keys, sharing) = cohort();
        let envelopes: Vec<_> = (1..=3)
            .map(|id| seal(key_for(&keys, &sharing, id), b"sid", 1, id, None, id as u32 * 10).unwrap())
            .collect();

        let opened = open_all(&sharing, b"sid", 1, 2, None, envelopes.clone()).unwrap();
        assert_eq!(opened.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(opened[&3], 30);

        let mut duplicated = envelopes.clone();
        duplicated.push(envelopes[0].clone());
        assert!(open_all(&sharing, b"sid", 1, 2, None, duplicated).is_err());
    }
}
