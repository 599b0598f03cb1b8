//! DKG protocol driver

use super::messages::{Round1Broadcast, Round1P2P};
use super::participant::Participant;
use crate::curve::Curve;
use crate::identity::AuthKey;
use crate::mpc::envelope::{open_all, seal, Envelope};
use crate::mpc::Relay;
use crate::{KeyShare, Result, SessionConfig};
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument};

const ROUND1: u32 = 1;

/// Run the distributed key generation protocol
///
/// Drives one [`Participant`] over `relay`: every outgoing message is signed
/// with `auth_key` and every incoming one is checked against the configured
/// identity keys before it reaches the participant.
///
/// # Arguments
/// * `auth_key` - This party's signing key; its identity must be configured
/// * `config` - Session configuration
/// * `rng` - This party's own randomness
/// * `relay` - Message relay for communication
///
/// # Returns
/// The party's key share after successful DKG
#[instrument(skip_all, fields(session_id = %hex::encode(&config.session_id)))]
pub async fn run_dkg<C, A, Rng, R>(
    auth_key: &A,
    config: SessionConfig<A::Identity>,
    rng: Rng,
    relay: &R,
) -> Result<KeyShare<C>>
where
    C: Curve,
    A: AuthKey,
    Rng: RngCore + CryptoRng + Send,
    R: Relay,
{
    let session_id = config.session_id.clone();
    let mut participant = Participant::<C, _, _>::new(&auth_key.identity(), config, None, rng)?;
    let me = participant.sharing_id();
    let n_parties = participant.sharing_config().len();

    info!(
        sharing_id = me,
        n_parties,
        threshold = participant.threshold(),
        curve = C::NAME,
        "Starting DKG"
    );

    debug!("DKG Round 1: Commitment and sharing");
    let output = participant.round1()?;

    let envelope = seal(auth_key, &session_id, ROUND1, me, None, output.broadcast)?;
    relay.broadcast(&session_id, ROUND1, &envelope).await?;
    for (to, message) in output.p2p {
        let envelope = seal(auth_key, &session_id, ROUND1, me, Some(to), message)?;
        relay.send_direct(&session_id, ROUND1, to, &envelope).await?;
    }

    let broadcasts: Vec<Envelope<Round1Broadcast>> = relay
        .collect_broadcasts(&session_id, ROUND1, n_parties)
        .await?;
    let shares: Vec<Envelope<Round1P2P>> = relay
        .collect_direct(&session_id, ROUND1, me, n_parties - 1)
        .await?;

    let sharing = participant.sharing_config();
    let broadcasts = open_all(sharing, &session_id, ROUND1, me, None, broadcasts)?;
    let shares = open_all(sharing, &session_id, ROUND1, me, Some(me), shares)?;

    debug!("DKG Round 2: Verification");
    participant.round2(&broadcasts, &shares)
}
