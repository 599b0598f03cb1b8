//! Agree on a fresh random value
//!
//! Commit-then-reveal: every party broadcasts `H(nonce)`, then the nonce.
//! The output hashes all nonces in sharing-id order, so it is uniform as long
//! as one party is honest. Used to derive DKG session ids.

use super::envelope::{open_all, seal};
use super::Relay;
use crate::identity::AuthKey;
use crate::sharing::SharingConfig;
use crate::{Error, Result, SharingId};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

const COMMIT_ROUND: u32 = 1;
const REVEAL_ROUND: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Commitment {
    digest: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reveal {
    nonce: Vec<u8>,
}

fn commit(channel: &[u8], id: SharingId, nonce: &[u8]) -> Vec<u8> {
    Sha3_256::new()
        .chain_update(b"tdkg-agree-on-random-commit")
        .chain_update((channel.len() as u64).to_le_bytes())
        .chain_update(channel)
        .chain_update((id as u64).to_le_bytes())
        .chain_update(nonce)
        .finalize()
        .to_vec()
}

/// Run commit-reveal over `relay` on `channel` and return 32 shared bytes
#[instrument(skip_all, fields(channel = %hex::encode(channel)))]
pub async fn agree_on_random<A, Rng, R>(
    auth_key: &A,
    participants: &[A::Identity],
    channel: &[u8],
    rng: &mut Rng,
    relay: &R,
) -> Result<[u8; 32]>
where
    A: AuthKey,
    Rng: RngCore + CryptoRng + Send,
    R: Relay,
{
    if channel.is_empty() {
        return Err(Error::InvalidArgument("Empty channel".into()));
    }
    let sharing = SharingConfig::derive(participants)?;
    let me = sharing.sharing_id(&auth_key.identity()).ok_or_else(|| {
        Error::InvalidConfig("Identity key is not a configured participant".into())
    })?;
    let n = sharing.len();

    let mut nonce = [0u8; 32];
    rng.fill_bytes(&mut nonce);
    let own_commitment = Commitment {
        digest: commit(channel, me, &nonce),
    };

    let envelope = seal(auth_key, channel, COMMIT_ROUND, me, None, own_commitment)?;
    relay.broadcast(channel, COMMIT_ROUND, &envelope).await?;
    let commitments = open_all::<_, Commitment>(
        &sharing,
        channel,
        COMMIT_ROUND,
        me,
        None,
        relay.collect_broadcasts(channel, COMMIT_ROUND, n).await?,
    )?;
    debug!(commitments = commitments.len(), "Collected commitments");

    let envelope = seal(
        auth_key,
        channel,
        REVEAL_ROUND,
        me,
        None,
        Reveal {
            nonce: nonce.to_vec(),
        },
    )?;
    relay.broadcast(channel, REVEAL_ROUND, &envelope).await?;
    let reveals = open_all::<_, Reveal>(
        &sharing,
        channel,
        REVEAL_ROUND,
        me,
        None,
        relay.collect_broadcasts(channel, REVEAL_ROUND, n).await?,
    )?;

    let mut output = Sha3_256::new()
        .chain_update(b"tdkg-agree-on-random-output")
        .chain_update((channel.len() as u64).to_le_bytes())
        .chain_update(channel);
    for id in sharing.ids() {
        let revealed = if id == me {
            nonce.to_vec()
        } else {
            let reveal = reveals
                .get(&id)
                .ok_or_else(|| Error::Missing(format!("reveal from sharing id {}", id)))?;
            let committed = commitments
                .get(&id)
                .ok_or_else(|| Error::Missing(format!("commitment from sharing id {}", id)))?;
            let opened = commit(channel, id, &reveal.nonce);
            if !bool::from(opened.as_slice().ct_eq(committed.digest.as_slice())) {
                return Err(Error::abort(id, "Reveal does not match commitment"));
            }
            reveal.nonce.clone()
        };
        output.update((revealed.len() as u64).to_le_bytes());
        output.update(&revealed);
    }

    Ok(output.finalize().into())
}
