//! Randomised Fischlin transform
//!
//! Compiles a [`SigmaProtocol`] into a non-interactive, straight-line
//! extractable proof. The prover runs `R` independent commitments, then for
//! each one searches random `T`-bit challenges (without repetition) until the
//! truncated digest of `(session id, crs, commitments, i, e_i, z_i)` is all
//! zero. The verifier recomputes every digest and checks the sigma relation.
//!
//! No rewinding is involved, so proofs compose inside multi-round protocols.

use super::sigma::SigmaProtocol;
use crate::transcript::TranscriptProtocol;
use crate::{Error, Result};
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::collections::HashSet;
use tracing::trace;

/// Computational security parameter
pub const LAMBDA: usize = 128;
/// Digest bits that must be zero per repetition
pub const L: usize = 8;
/// Number of repetitions
pub const R: usize = LAMBDA / L;
/// Challenge length in bits. `log2(LAMBDA)` rounded up to a power of two is
/// 8; challenges carry twice that, `2 * L` bits.
pub const T: usize = 2 * L;
/// Truncated digest length in bytes
pub const L_BYTES: usize = L / 8;

const T_BYTES: usize = T / 8;
const CHALLENGE_SPACE: usize = 1 << T;
const DIGEST_DST: &[u8] = b"tdkg-randomised-fischlin-v1";

/// Non-interactive proof, carried as canonical encodings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FischlinProof {
    /// Sigma commitments `a_1..a_R`
    pub commitments: Vec<Vec<u8>>,
    /// Accepted challenges `e_1..e_R`
    pub challenges: Vec<Vec<u8>>,
    /// Responses `z_1..z_R`
    pub responses: Vec<Vec<u8>>,
}

/// Compiles one sigma protocol; stateless and shareable across proofs
#[derive(Debug, Clone)]
pub struct Compiler<P: SigmaProtocol> {
    protocol: P,
}

impl<P: SigmaProtocol> Compiler<P> {
    pub fn new(protocol: P) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Prover bound to `session_id` and `transcript`
    pub fn prover(&self, session_id: &[u8], transcript: Transcript) -> Result<Prover<'_, P>> {
        if session_id.is_empty() {
            return Err(Error::InvalidArgument("Empty session id".into()));
        }
        Ok(Prover {
            protocol: &self.protocol,
            session_id: session_id.to_vec(),
            transcript,
        })
    }

    /// Verifier bound to `session_id` and `transcript`
    pub fn verifier(&self, session_id: &[u8], transcript: Transcript) -> Result<Verifier<'_, P>> {
        if session_id.is_empty() {
            return Err(Error::InvalidArgument("Empty session id".into()));
        }
        Ok(Verifier {
            protocol: &self.protocol,
            session_id: session_id.to_vec(),
            transcript,
        })
    }
}

pub struct Prover<'a, P: SigmaProtocol> {
    protocol: &'a P,
    session_id: Vec<u8>,
    transcript: Transcript,
}

pub struct Verifier<'a, P: SigmaProtocol> {
    protocol: &'a P,
    session_id: Vec<u8>,
    transcript: Transcript,
}

fn length_prefixed(buffer: &mut Vec<u8>, bytes: &[u8]) {
    buffer.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    buffer.extend_from_slice(bytes);
}

/// Absorb the statement and commitments; returns the common reference string
fn bind_statement(
    transcript: &mut Transcript,
    protocol_name: &'static str,
    session_id: &[u8],
    statement: &[u8],
    commitments: &[u8],
) -> [u8; 32] {
    transcript.append_message(b"fischlin-protocol", protocol_name.as_bytes());
    transcript.append_message(b"fischlin-session-id", session_id);
    transcript.append_message(b"fischlin-statement", statement);
    transcript.append_message(b"fischlin-commitments", commitments);
    transcript.challenge_array(b"fischlin-crs")
}

fn bind_challenges(transcript: &mut Transcript, challenges: &[Vec<u8>]) {
    transcript.append_message(b"fischlin-challenges", &challenges.concat());
}

/// Whether the truncated digest for repetition `index` is all zero
fn digest_is_zero(
    session_id: &[u8],
    crs: &[u8; 32],
    commitments: &[u8],
    index: usize,
    challenge: &[u8],
    response: &[u8],
) -> bool {
    let digest = Sha3_256::new()
        .chain_update(DIGEST_DST)
        .chain_update((session_id.len() as u64).to_le_bytes())
        .chain_update(session_id)
        .chain_update(crs)
        .chain_update((commitments.len() as u64).to_le_bytes())
        .chain_update(commitments)
        .chain_update((index as u64).to_le_bytes())
        .chain_update(challenge)
        .chain_update((response.len() as u64).to_le_bytes())
        .chain_update(response)
        .finalize();
    digest[..L_BYTES].iter().all(|byte| *byte == 0)
}

impl<'a, P: SigmaProtocol> Prover<'a, P> {
    pub fn prove<Rng: RngCore + CryptoRng>(
        &mut self,
        statement: &P::Statement,
        witness: &P::Witness,
        rng: &mut Rng,
    ) -> Result<FischlinProof> {
        let mut states = Vec::with_capacity(R);
        let mut commitments = Vec::with_capacity(R);
        let mut buffer = Vec::new();
        for _ in 0..R {
            let (commitment, state) = self.protocol.commit(statement, witness, rng)?;
            let encoded = self.protocol.commitment_bytes(&commitment);
            length_prefixed(&mut buffer, &encoded);
            commitments.push(encoded);
            states.push(state);
        }

        let crs = bind_statement(
            &mut self.transcript,
            P::NAME,
            &self.session_id,
            &self.protocol.statement_bytes(statement),
            &buffer,
        );

        let mut challenges = Vec::with_capacity(R);
        let mut responses = Vec::with_capacity(R);
        for (index, state) in states.iter().enumerate() {
            let (challenge, response) =
                self.grind(statement, witness, state, &crs, &buffer, index, rng)?;
            challenges.push(challenge);
            responses.push(response);
        }

        bind_challenges(&mut self.transcript, &challenges);

        Ok(FischlinProof {
            commitments,
            challenges,
            responses,
        })
    }

    /// Search fresh challenges for repetition `index` until the digest is zero
    #[allow(clippy::too_many_arguments)]
    fn grind<Rng: RngCore + CryptoRng>(
        &self,
        statement: &P::Statement,
        witness: &P::Witness,
        state: &P::State,
        crs: &[u8; 32],
        commitments: &[u8],
        index: usize,
        rng: &mut Rng,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut tried = HashSet::new();
        while tried.len() < CHALLENGE_SPACE {
            let mut challenge = [0u8; T_BYTES];
            rng.fill_bytes(&mut challenge);
            if !tried.insert(challenge) {
                continue;
            }

            let response = self.protocol.respond(statement, witness, state, &challenge)?;
            let encoded = self.protocol.response_bytes(&response);
            if digest_is_zero(&self.session_id, crs, commitments, index, &challenge, &encoded) {
                trace!(index, attempts = tried.len(), "Fischlin repetition accepted");
                return Ok((challenge.to_vec(), encoded));
            }
        }

        Err(Error::Crypto(format!(
            "Challenge space exhausted for repetition {}",
            index
        )))
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }
}

impl<'a, P: SigmaProtocol> Verifier<'a, P> {
    pub fn verify(&mut self, statement: &P::Statement, proof: &FischlinProof) -> Result<()> {
        if proof.commitments.len() != R
            || proof.challenges.len() != R
            || proof.responses.len() != R
        {
            return Err(Error::VerificationFailed(format!(
                "Proof must carry {} repetitions",
                R
            )));
        }

        let mut buffer = Vec::new();
        let mut commitments = Vec::with_capacity(R);
        for encoded in &proof.commitments {
            length_prefixed(&mut buffer, encoded);
            let commitment = self
                .protocol
                .commitment_from_bytes(encoded)
                .map_err(|e| Error::VerificationFailed(format!("Malformed commitment: {}", e)))?;
            commitments.push(commitment);
        }

        let crs = bind_statement(
            &mut self.transcript,
            P::NAME,
            &self.session_id,
            &self.protocol.statement_bytes(statement),
            &buffer,
        );

        for (index, commitment) in commitments.iter().enumerate() {
            let challenge = &proof.challenges[index];
            let encoded = &proof.responses[index];
            if challenge.len() != T_BYTES {
                return Err(Error::VerificationFailed(format!(
                    "Challenge {} has length {}",
                    index,
                    challenge.len()
                )));
            }
            if !digest_is_zero(&self.session_id, &crs, &buffer, index, challenge, encoded) {
                return Err(Error::VerificationFailed(format!(
                    "Digest of repetition {} is not zero",
                    index
                )));
            }
            let response = self
                .protocol
                .response_from_bytes(encoded)
                .map_err(|e| Error::VerificationFailed(format!("Malformed response: {}", e)))?;
            self.protocol
                .verify(statement, commitment, challenge, &response)?;
        }

        bind_challenges(&mut self.transcript, &proof.challenges);
        Ok(())
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }
}
