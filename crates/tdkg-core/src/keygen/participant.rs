//! DKG round participant
//!
//! Each party deals a Feldman sharing of a fresh secret and proves knowledge
//! of it (round 1), then checks every peer's proof and share and sums the
//! shares it received (round 2). The group secret is the sum of all dealt
//! secrets and is never held by anyone.

use super::messages::{Round1Broadcast, Round1P2P};
use crate::curve::{decode_point, point_to_bytes, scalar_from_bytes, scalar_to_bytes, Curve};
use crate::identity::IdentityKey;
use crate::proofs::{Compiler, DlogProtocol};
use crate::sharing::feldman::{self, Dealer, Share};
use crate::sharing::SharingConfig;
use crate::transcript::TranscriptProtocol;
use crate::types::{KeyShare, PublicKeyShares, SessionConfig, SigningKeyShare};
use crate::{Error, Result, SharingId};
use elliptic_curve::{ff::Field, group::Group};
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroize;

#[cfg(feature = "multi-thread")]
use rayon::prelude::*;

const TRANSCRIPT_LABEL: &[u8] = b"tdkg-feldman-dkg";
const PROVER_ID_LABEL: &[u8] = b"prover sharing id";

/// Participant lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingRound1,
    AwaitingRound2,
    Completed,
    Aborted,
}

impl State {
    pub fn name(self) -> &'static str {
        match self {
            State::AwaitingRound1 => "AwaitingRound1",
            State::AwaitingRound2 => "AwaitingRound2",
            State::Completed => "Completed",
            State::Aborted => "Aborted",
        }
    }
}

/// Messages produced by round 1
#[derive(Debug, Clone)]
pub struct Round1Output {
    /// Sent to every other party
    pub broadcast: Round1Broadcast,
    /// One message per other party, keyed by recipient
    pub p2p: BTreeMap<SharingId, Round1P2P>,
}

/// What round 1 keeps for round 2
struct Dealt<C: Curve> {
    commitments: Vec<C::Point>,
    own_share: Share<C>,
}

/// A peer whose round 1 messages checked out
struct VerifiedPeer<C: Curve> {
    id: SharingId,
    commitments: Vec<C::Point>,
    share: C::Scalar,
    partial_public_key: C::Point,
}

/// Read-only context for checking peers, shareable across threads
struct PeerCheck<'a, C: Curve> {
    compiler: &'a Compiler<DlogProtocol<C>>,
    transcript: &'a Transcript,
    session_id: &'a [u8],
    threshold: usize,
    receiver: SharingId,
}

impl<'a, C: Curve> PeerCheck<'a, C> {
    fn verify(&self, id: SharingId, broadcast: &Round1Broadcast, p2p: &Round1P2P) -> Result<VerifiedPeer<C>> {
        broadcast
            .validate(self.threshold)
            .and_then(|_| p2p.validate(self.threshold))
            .map_err(|e| Error::abort(id, e.to_string()))?;

        let commitments = broadcast
            .commitments
            .iter()
            .map(|bytes| decode_point::<C>(bytes))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::abort(id, format!("Malformed commitment: {}", e)))?;

        let constant = *commitments
            .first()
            .ok_or_else(|| Error::abort(id, "No commitments"))?;
        if bool::from(constant.is_identity()) {
            return Err(Error::abort(id, "Commitment to the local secret is the identity"));
        }

        let mut transcript = self.transcript.clone();
        transcript.append_sharing_id(PROVER_ID_LABEL, id);
        let mut verifier = self.compiler.verifier(self.session_id, transcript)?;
        verifier
            .verify(&constant, &broadcast.proof)
            .map_err(|e| Error::abort(id, format!("Invalid proof of knowledge: {}", e)))?;

        let value = scalar_from_bytes::<C::Scalar>(&p2p.share)
            .map_err(|e| Error::abort(id, format!("Malformed share: {}", e)))?;
        let share = Share::<C> {
            id: self.receiver,
            value,
        };
        let partial_public_key = feldman::verify(&share, &commitments)
            .map_err(|e| Error::abort(id, format!("Share inconsistent with commitments: {}", e)))?;

        Ok(VerifiedPeer {
            id,
            commitments,
            share: value,
            partial_public_key,
        })
    }
}

/// One party of one DKG execution
pub struct Participant<C: Curve, I: IdentityKey, Rng> {
    sharing_id: SharingId,
    config: SessionConfig<I>,
    sharing: SharingConfig<I>,
    transcript: Transcript,
    compiler: Compiler<DlogProtocol<C>>,
    rng: Rng,
    state: State,
    dealt: Option<Dealt<C>>,
}

impl<C, I, Rng> Participant<C, I, Rng>
where
    C: Curve,
    I: IdentityKey,
    Rng: RngCore + CryptoRng,
{
    /// Create the participant holding `my_identity`.
    ///
    /// `transcript` may carry caller context; it is extended with the curve,
    /// session id, threshold and participant set.
    pub fn new(
        my_identity: &I,
        config: SessionConfig<I>,
        transcript: Option<Transcript>,
        rng: Rng,
    ) -> Result<Self> {
        config.validate()?;
        let sharing = config.sharing_config()?;
        let sharing_id = sharing.sharing_id(my_identity).ok_or_else(|| {
            Error::InvalidConfig("Identity key is not a configured participant".into())
        })?;

        let mut transcript = transcript.unwrap_or_else(|| Transcript::new(TRANSCRIPT_LABEL));
        transcript.append_message(b"curve", C::NAME.as_bytes());
        transcript.append_message(b"session id", &config.session_id);
        transcript.append_u64(b"threshold", config.threshold as u64);
        for (id, identity) in sharing.iter() {
            transcript.append_sharing_id(b"participant id", id);
            transcript.append_message(b"participant key", &identity.to_bytes());
        }

        debug!(
            sharing_id,
            threshold = config.threshold,
            n_parties = sharing.len(),
            curve = C::NAME,
            "Created DKG participant"
        );

        Ok(Self {
            sharing_id,
            config,
            sharing,
            transcript,
            compiler: Compiler::new(DlogProtocol::generator()),
            rng,
            state: State::AwaitingRound1,
            dealt: None,
        })
    }

    pub fn sharing_id(&self) -> SharingId {
        self.sharing_id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn session_id(&self) -> &[u8] {
        &self.config.session_id
    }

    pub fn threshold(&self) -> usize {
        self.config.threshold
    }

    pub fn sharing_config(&self) -> &SharingConfig<I> {
        &self.sharing
    }

    fn expect_state(&self, expected: State) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidRound {
                expected: expected.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }

    /// Deal a fresh secret and prove knowledge of it
    #[instrument(skip_all, fields(sharing_id = self.sharing_id))]
    pub fn round1(&mut self) -> Result<Round1Output> {
        self.expect_state(State::AwaitingRound1)?;
        debug!("DKG round 1: dealing local secret");

        let dealer = Dealer::<C>::new(self.config.threshold, self.sharing.len())?;
        let mut secret = Share::<C> {
            id: 0,
            value: C::Scalar::random(&mut self.rng),
        };
        if bool::from(secret.value.is_zero()) {
            return Err(Error::Crypto("Sampled a zero secret".into()));
        }
        let (commitments, mut shares) = dealer.split(Some(secret.value), &mut self.rng)?;

        let mut transcript = self.transcript.clone();
        transcript.append_sharing_id(PROVER_ID_LABEL, self.sharing_id);
        let mut prover = self.compiler.prover(&self.config.session_id, transcript)?;
        let proof = prover.prove(&commitments[0], &secret.value, &mut self.rng);
        secret.zeroize();
        let proof = proof?;

        let mut p2p = BTreeMap::new();
        let mut own_share = None;
        for share in shares.iter_mut() {
            if share.id == self.sharing_id {
                own_share = Some(share.clone());
            } else {
                p2p.insert(
                    share.id,
                    Round1P2P {
                        share: scalar_to_bytes(&share.value),
                    },
                );
            }
            share.zeroize();
        }
        let own_share =
            own_share.ok_or_else(|| Error::Internal("No share dealt to own sharing id".into()))?;

        let broadcast = Round1Broadcast {
            commitments: commitments.iter().map(point_to_bytes).collect(),
            proof,
        };

        self.dealt = Some(Dealt {
            commitments,
            own_share,
        });
        self.state = State::AwaitingRound2;
        debug!(recipients = p2p.len(), "DKG round 1 complete");

        Ok(Round1Output { broadcast, p2p })
    }

    /// Verify every peer's round 1 messages and derive this party's key share.
    ///
    /// Missing messages are a local error and leave the participant in
    /// `AwaitingRound2`. Any failed check aborts the execution.
    #[instrument(skip_all, fields(sharing_id = self.sharing_id))]
    pub fn round2(
        &mut self,
        broadcasts: &BTreeMap<SharingId, Round1Broadcast>,
        p2p: &BTreeMap<SharingId, Round1P2P>,
    ) -> Result<KeyShare<C>> {
        self.expect_state(State::AwaitingRound2)?;
        debug!("DKG round 2: verifying peers");

        let mut peers = Vec::with_capacity(self.sharing.len());
        for id in self.sharing.ids().filter(|id| *id != self.sharing_id) {
            let broadcast = broadcasts.get(&id).ok_or_else(|| {
                Error::Missing(format!("round 1 broadcast from sharing id {}", id))
            })?;
            let share = p2p.get(&id).ok_or_else(|| {
                Error::Missing(format!("round 1 share from sharing id {}", id))
            })?;
            peers.push((id, broadcast, share));
        }

        match self.finish(&peers) {
            Ok(key_share) => {
                self.state = State::Completed;
                self.discard_dealt();
                info!(
                    public_key = %key_share.public_key_hex(),
                    "DKG completed successfully"
                );
                Ok(key_share)
            }
            Err(e) => {
                if e.is_abort() {
                    warn!(blamed = ?e.blamed(), error = %e, "DKG aborted");
                    self.state = State::Aborted;
                    self.discard_dealt();
                }
                Err(e)
            }
        }
    }

    fn discard_dealt(&mut self) {
        if let Some(mut dealt) = self.dealt.take() {
            dealt.own_share.zeroize();
        }
    }

    /// Peers are checked in sharing-id order; the first failure is reported
    fn verify_peers(
        &self,
        peers: &[(SharingId, &Round1Broadcast, &Round1P2P)],
    ) -> Result<Vec<VerifiedPeer<C>>> {
        let check = PeerCheck {
            compiler: &self.compiler,
            transcript: &self.transcript,
            session_id: &self.config.session_id,
            threshold: self.config.threshold,
            receiver: self.sharing_id,
        };

        #[cfg(feature = "multi-thread")]
        let results: Vec<Result<VerifiedPeer<C>>> = peers
            .par_iter()
            .map(|(id, broadcast, share)| check.verify(*id, broadcast, share))
            .collect();

        #[cfg(not(feature = "multi-thread"))]
        let results: Vec<Result<VerifiedPeer<C>>> = peers
            .iter()
            .map(|(id, broadcast, share)| check.verify(*id, broadcast, share))
            .collect();

        results.into_iter().collect()
    }

    fn finish(&self, peers: &[(SharingId, &Round1Broadcast, &Round1P2P)]) -> Result<KeyShare<C>> {
        let dealt = self
            .dealt
            .as_ref()
            .ok_or_else(|| Error::Internal("Round 1 output is gone".into()))?;

        let verified = self.verify_peers(peers)?;
        debug!(peers = verified.len(), "All peers verified");

        let mut share = dealt.own_share.value;
        let mut public_key = dealt.commitments[0];
        let mut implied_own = C::scalar_base_mul(&dealt.own_share.value);
        let mut vectors = BTreeMap::new();
        vectors.insert(self.sharing_id, dealt.commitments.clone());

        for peer in verified {
            share += peer.share;
            public_key += peer.commitments[0];
            implied_own += peer.partial_public_key;
            vectors.insert(peer.id, peer.commitments);
        }

        let public_key_shares = PublicKeyShares::<C>::from_commitment_vectors(
            &vectors,
            self.sharing.ids(),
        )
        .map_err(|e| Error::TotalAbort(e.to_string()))?;

        let expected_own = public_key_shares
            .share(self.sharing_id)
            .ok_or_else(|| Error::TotalAbort("Own public key share is missing".into()))?;
        if C::scalar_base_mul(&share) != *expected_own || implied_own != *expected_own {
            return Err(Error::TotalAbort(
                "Own public key share diverges from the collected commitments".into(),
            ));
        }
        if public_key != public_key_shares.public_key {
            return Err(Error::TotalAbort(
                "Public key diverges from the collected commitments".into(),
            ));
        }

        Ok(KeyShare {
            curve: C::NAME.to_string(),
            sharing_id: self.sharing_id,
            threshold: self.config.threshold,
            n_parties: self.sharing.len(),
            signing_key_share: SigningKeyShare { share, public_key },
            public_key_shares,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Ed25519, Secp256k1};
    use crate::identity::{AuthKey, Ed25519AuthKey, Secp256k1AuthKey};
    use crate::ErrorClass;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    type Party<C, I> = Participant<C, I, ChaCha20Rng>;
    type Inbox = (
        BTreeMap<SharingId, Round1Broadcast>,
        BTreeMap<SharingId, Round1P2P>,
    );

    fn secp_identities(n: usize) -> Vec<crate::identity::Secp256k1Identity> {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        (0..n)
            .map(|_| Secp256k1AuthKey::generate(&mut rng).identity())
            .collect()
    }

    fn ed_identities(n: usize) -> Vec<crate::identity::Ed25519Identity> {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        (0..n)
            .map(|_| Ed25519AuthKey::generate(&mut rng).identity())
            .collect()
    }

    /// Parties sorted by sharing id, each with its own seeded rng
    fn parties<C: Curve, I: IdentityKey>(
        identities: &[I],
        threshold: usize,
        session_id: &[u8],
        seed: u64,
    ) -> Vec<Party<C, I>> {
        let config = SessionConfig::new(session_id.to_vec(), threshold, identities.to_vec()).unwrap();
        let mut parties: Vec<_> = identities
            .iter()
            .enumerate()
            .map(|(i, identity)| {
                let rng = ChaCha20Rng::seed_from_u64(seed * 1000 + i as u64);
                Participant::new(identity, config.clone(), None, rng).unwrap()
            })
            .collect();
        parties.sort_by_key(|p| p.sharing_id());
        parties
    }

    fn round1<C: Curve, I: IdentityKey>(
        parties: &mut [Party<C, I>],
    ) -> BTreeMap<SharingId, Round1Output> {
        parties
            .iter_mut()
            .map(|p| (p.sharing_id(), p.round1().unwrap()))
            .collect()
    }

    fn inbox(outputs: &BTreeMap<SharingId, Round1Output>, to: SharingId) -> Inbox {
        let broadcasts = outputs
            .iter()
            .filter(|(from, _)| **from != to)
            .map(|(from, out)| (*from, out.broadcast.clone()))
            .collect();
        let p2p = outputs
            .iter()
            .filter(|(from, _)| **from != to)
            .map(|(from, out)| (*from, out.p2p[&to].clone()))
            .collect();
        (broadcasts, p2p)
    }

    fn run<C: Curve, I: IdentityKey>(parties: &mut [Party<C, I>]) -> Vec<KeyShare<C>> {
        let outputs = round1(parties);
        parties
            .iter_mut()
            .map(|p| {
                let (broadcasts, p2p) = inbox(&outputs, p.sharing_id());
                p.round2(&broadcasts, &p2p).unwrap()
            })
            .collect()
    }

    fn reconstruct<C: Curve>(key_shares: &[&KeyShare<C>]) -> C::Scalar {
        let shares: Vec<Share<C>> = key_shares
            .iter()
            .map(|ks| Share {
                id: ks.sharing_id,
                value: ks.signing_key_share.share,
            })
            .collect();
        feldman::combine(&shares).unwrap()
    }

    fn tamper_share<C: Curve>(message: &mut Round1P2P) {
        let value: C::Scalar = scalar_from_bytes(&message.share).unwrap();
        message.share = scalar_to_bytes(&(value + C::Scalar::ONE));
    }

    #[test]
    fn test_two_of_three() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"two-of-three", 1);
        assert_eq!(
            parties.iter().map(|p| p.sharing_id()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let key_shares = run(&mut parties);
        assert!(parties.iter().all(|p| p.state() == State::Completed));

        let public_key = key_shares[0].signing_key_share.public_key;
        for ks in &key_shares {
            assert_eq!(ks.signing_key_share.public_key, public_key);
            assert_eq!(ks.public_key_shares, key_shares[0].public_key_shares);
            assert_eq!(
                ks.signing_key_share.public_key_share(),
                key_shares[0].public_key_shares.shares[&ks.sharing_id]
            );
        }
        key_shares[0].public_key_shares.validate(2).unwrap();

        let x12 = reconstruct(&[&key_shares[0], &key_shares[1]]);
        let x13 = reconstruct(&[&key_shares[0], &key_shares[2]]);
        let x23 = reconstruct(&[&key_shares[1], &key_shares[2]]);
        assert_eq!(x12, x13);
        assert_eq!(x12, x23);
        assert_eq!(Secp256k1::scalar_base_mul(&x12), public_key);

        for (i, a) in key_shares.iter().enumerate() {
            for b in &key_shares[i + 1..] {
                assert_ne!(a.signing_key_share.share, b.signing_key_share.share);
            }
        }
    }

    #[test]
    fn test_ed25519_three_of_five() {
        let identities = ed_identities(5);
        let mut parties = parties::<Ed25519, _>(&identities, 3, b"three-of-five", 2);
        let key_shares = run(&mut parties);

        let public_key = key_shares[0].signing_key_share.public_key;
        let secret = reconstruct(&[&key_shares[0], &key_shares[2], &key_shares[4]]);
        assert_eq!(Ed25519::scalar_base_mul(&secret), public_key);
        assert_eq!(
            reconstruct(&[&key_shares[1], &key_shares[2], &key_shares[3]]),
            secret
        );

        let too_few = reconstruct(&[&key_shares[0], &key_shares[1]]);
        assert_ne!(too_few, secret);
        key_shares[3].public_key_shares.validate(3).unwrap();
    }

    #[test]
    fn test_tampered_share_blames_sender() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"tampered", 3);
        let mut outputs = round1(&mut parties);

        if let Some(message) = outputs.get_mut(&1).and_then(|out| out.p2p.get_mut(&2)) {
            tamper_share::<Secp256k1>(message);
        }

        let (broadcasts, p2p) = inbox(&outputs, 2);
        let err = parties[1].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.class(), ErrorClass::IdentifiableAbort);
        assert_eq!(err.blamed(), Some(1));
        assert_eq!(parties[1].state(), State::Aborted);

        let (broadcasts, p2p) = inbox(&outputs, 3);
        parties[2].round2(&broadcasts, &p2p).unwrap();
    }

    #[test]
    fn test_lowest_culprit_is_blamed() {
        let identities = secp_identities(4);
        let mut parties = parties::<Secp256k1, _>(&identities, 3, b"two culprits", 4);
        let mut outputs = round1(&mut parties);

        for culprit in [4, 1] {
            if let Some(message) = outputs.get_mut(&culprit).and_then(|out| out.p2p.get_mut(&2)) {
                tamper_share::<Secp256k1>(message);
            }
        }

        let (broadcasts, p2p) = inbox(&outputs, 2);
        let err = parties[1].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));
    }

    #[test]
    fn test_out_of_order_rounds() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"order", 5);

        let err = parties[0]
            .round2(&BTreeMap::new(), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRound { .. }));
        assert_eq!(parties[0].state(), State::AwaitingRound1);

        parties[0].round1().unwrap();
        let err = parties[0].round1().unwrap_err();
        assert!(matches!(err, Error::InvalidRound { .. }));
        assert_eq!(parties[0].state(), State::AwaitingRound2);
    }

    #[test]
    fn test_missing_input_then_retry() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"missing", 6);
        let outputs = round1(&mut parties);

        let (broadcasts, p2p) = inbox(&outputs, 1);
        let mut partial = broadcasts.clone();
        partial.remove(&3);

        let err = parties[0].round2(&partial, &p2p).unwrap_err();
        assert!(matches!(err, Error::Missing(_)));
        assert_eq!(err.class(), ErrorClass::Local);
        assert_eq!(parties[0].state(), State::AwaitingRound2);

        let mut no_share = p2p.clone();
        no_share.remove(&2);
        assert!(matches!(
            parties[0].round2(&broadcasts, &no_share).unwrap_err(),
            Error::Missing(_)
        ));

        parties[0].round2(&broadcasts, &p2p).unwrap();
        assert_eq!(parties[0].state(), State::Completed);
    }

    #[test]
    fn test_replay_from_previous_session() {
        let identities = secp_identities(3);
        let mut old = parties::<Secp256k1, _>(&identities, 2, b"session one", 7);
        let old_outputs = round1(&mut old);

        let mut new = parties::<Secp256k1, _>(&identities, 2, b"session two", 8);
        let new_outputs = round1(&mut new);

        // Proof and commitments from the old session
        let (mut broadcasts, p2p) = inbox(&new_outputs, 2);
        broadcasts.insert(1, old_outputs[&1].broadcast.clone());
        let err = new[1].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));

        // Share from the old session
        let (broadcasts, mut p2p) = inbox(&new_outputs, 3);
        p2p.insert(1, old_outputs[&1].p2p[&3].clone());
        let err = new[2].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));
    }

    #[test]
    fn test_mismatched_session_id_is_blamed() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"agreed", 9);

        let stray_identity = parties[2].sharing_config().identity(3).unwrap().clone();
        let stray_config = SessionConfig::new(b"stray".to_vec(), 2, identities.clone()).unwrap();
        parties[2] = Participant::new(
            &stray_identity,
            stray_config,
            None,
            ChaCha20Rng::seed_from_u64(99),
        )
        .unwrap();

        let outputs = round1(&mut parties);
        let (broadcasts, p2p) = inbox(&outputs, 1);
        let err = parties[0].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(3));
    }

    #[test]
    fn test_outsider_rejected() {
        let identities = secp_identities(3);
        let config = SessionConfig::new(b"sid".to_vec(), 2, identities).unwrap();
        let outsider = Secp256k1AuthKey::generate(&mut ChaCha20Rng::seed_from_u64(1)).identity();

        let result = Party::<Secp256k1, _>::new(&outsider, config, None, ChaCha20Rng::seed_from_u64(2));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_degenerate_commitments_rejected() {
        use curve25519_dalek::constants::EIGHT_TORSION;
        use curve25519_dalek::EdwardsPoint;

        let identities = ed_identities(3);
        let mut parties = parties::<Ed25519, _>(&identities, 2, b"degenerate", 10);
        let outputs = round1(&mut parties);

        let (mut broadcasts, p2p) = inbox(&outputs, 2);
        if let Some(message) = broadcasts.get_mut(&1) {
            message.commitments[0] = point_to_bytes(&<EdwardsPoint as Group>::identity());
        }
        let err = parties[1].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));

        let (mut broadcasts, p2p) = inbox(&outputs, 3);
        if let Some(message) = broadcasts.get_mut(&1) {
            let constant = decode_point::<Ed25519>(&message.commitments[0]).unwrap();
            message.commitments[0] = point_to_bytes(&(constant + EIGHT_TORSION[1]));
        }
        let err = parties[2].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));
    }

    /// Prove `statement` under the transcript `party` uses for its own round 1 proof
    fn prove_as<C: Curve, I: IdentityKey>(
        party: &mut Party<C, I>,
        statement: &C::Point,
        witness: &C::Scalar,
    ) -> crate::proofs::FischlinProof {
        let mut transcript = party.transcript.clone();
        transcript.append_sharing_id(PROVER_ID_LABEL, party.sharing_id);
        let mut prover = party
            .compiler
            .prover(&party.config.session_id, transcript)
            .unwrap();
        prover.prove(statement, witness, &mut party.rng).unwrap()
    }

    #[test]
    fn test_rogue_key_is_blamed() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"rogue key", 13);
        let mut outputs = round1(&mut parties);

        // Party 1 cancels party 2's contribution to the group key
        let victim = decode_point::<Secp256k1>(&outputs[&2].broadcast.commitments[0]).unwrap();
        if let Some(out) = outputs.get_mut(&1) {
            let own = decode_point::<Secp256k1>(&out.broadcast.commitments[0]).unwrap();
            out.broadcast.commitments[0] = point_to_bytes(&(own - victim));
        }

        let (broadcasts, p2p) = inbox(&outputs, 3);
        let err = parties[2].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.class(), ErrorClass::IdentifiableAbort);
        assert_eq!(err.blamed(), Some(1));
        assert_eq!(parties[2].state(), State::Aborted);
    }

    #[test]
    fn test_proof_of_unrelated_statement_is_blamed() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"unrelated statement", 14);
        let mut outputs = round1(&mut parties);

        // Valid proof, right session and prover, wrong statement
        let witness = <Secp256k1 as Curve>::Scalar::from(42u64);
        let statement = Secp256k1::scalar_base_mul(&witness);
        let proof = prove_as(&mut parties[0], &statement, &witness);
        if let Some(out) = outputs.get_mut(&1) {
            out.broadcast.proof = proof;
        }

        let (broadcasts, p2p) = inbox(&outputs, 2);
        let err = parties[1].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));
    }

    #[test]
    fn test_proof_of_identity_is_blamed() {
        let identities = ed_identities(3);
        let mut parties = parties::<Ed25519, _>(&identities, 2, b"identity statement", 15);
        let outputs = round1(&mut parties);

        let witness = <Ed25519 as Curve>::Scalar::ZERO;
        let identity = <<Ed25519 as Curve>::Point as Group>::identity();
        let proof = prove_as(&mut parties[0], &identity, &witness);

        // Alongside the honest commitments
        let (mut broadcasts, p2p) = inbox(&outputs, 2);
        if let Some(message) = broadcasts.get_mut(&1) {
            message.proof = proof.clone();
        }
        let err = parties[1].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));

        // And with the commitment to the local secret replaced to match
        let (mut broadcasts, p2p) = inbox(&outputs, 3);
        if let Some(message) = broadcasts.get_mut(&1) {
            message.commitments[0] = point_to_bytes(&identity);
            message.proof = proof;
        }
        let err = parties[2].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));
    }

    #[test]
    fn test_share_from_earlier_round_is_blamed() {
        let identities = secp_identities(3);
        let mut first = parties::<Secp256k1, _>(&identities, 2, b"reused session", 16);
        let outputs = round1(&mut first);

        // Same session id, party 1 deals again and replays its first share
        let mut rerun = parties::<Secp256k1, _>(&identities, 2, b"reused session", 17);
        let rerun_outputs = round1(&mut rerun);

        let (broadcasts, mut p2p) = inbox(&rerun_outputs, 2);
        p2p.insert(1, outputs[&1].p2p[&2].clone());
        let err = rerun[1].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));

        // A zeroed share
        let (broadcasts, mut p2p) = inbox(&outputs, 3);
        p2p.insert(
            1,
            Round1P2P {
                share: scalar_to_bytes(&<Secp256k1 as Curve>::Scalar::ZERO),
            },
        );
        let err = first[2].round2(&broadcasts, &p2p).unwrap_err();
        assert_eq!(err.blamed(), Some(1));
    }

    #[test]
    fn test_key_share_json() {
        let identities = secp_identities(3);
        let mut parties = parties::<Secp256k1, _>(&identities, 2, b"persist", 12);
        let key_shares = run(&mut parties);

        let json = key_shares[0].to_json().unwrap();
        let parsed = KeyShare::<Secp256k1>::from_json(&json).unwrap();
        assert_eq!(parsed.signing_key_share.share, key_shares[0].signing_key_share.share);
        assert_eq!(parsed.public_key_shares, key_shares[0].public_key_shares);
        assert!(KeyShare::<Ed25519>::from_json(&json).is_err());
    }
}
