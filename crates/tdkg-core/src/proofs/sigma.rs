//! Interactive three-move proofs of knowledge

use crate::Result;
use rand_core::{CryptoRng, RngCore};

/// A sigma protocol: commit, challenge, respond.
///
/// Challenges are opaque byte strings chosen by the compiler. Encodings are
/// part of the protocol so compiled proofs can be carried as bytes.
pub trait SigmaProtocol: Send + Sync {
    type Statement;
    type Witness;
    type Commitment;
    type State;
    type Response;

    /// Domain separator for transcripts and digests
    const NAME: &'static str;

    fn commit<R: RngCore + CryptoRng>(
        &self,
        statement: &Self::Statement,
        witness: &Self::Witness,
        rng: &mut R,
    ) -> Result<(Self::Commitment, Self::State)>;

    fn respond(
        &self,
        statement: &Self::Statement,
        witness: &Self::Witness,
        state: &Self::State,
        challenge: &[u8],
    ) -> Result<Self::Response>;

    /// Check the protocol relation on `(statement, commitment, challenge, response)`
    fn verify(
        &self,
        statement: &Self::Statement,
        commitment: &Self::Commitment,
        challenge: &[u8],
        response: &Self::Response,
    ) -> Result<()>;

    fn statement_bytes(&self, statement: &Self::Statement) -> Vec<u8>;

    fn commitment_bytes(&self, commitment: &Self::Commitment) -> Vec<u8>;

    fn commitment_from_bytes(&self, bytes: &[u8]) -> Result<Self::Commitment>;

    fn response_bytes(&self, response: &Self::Response) -> Vec<u8>;

    fn response_from_bytes(&self, bytes: &[u8]) -> Result<Self::Response>;
}
