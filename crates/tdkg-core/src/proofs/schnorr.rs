//! Schnorr proof of knowledge of a discrete logarithm
//!
//! Statement `X`, witness `w` with `X = w · B`. Commitment `a = k · B`,
//! response `z = k + e · w`, accepted iff `z · B == a + e · X`.

use super::sigma::SigmaProtocol;
use crate::curve::{decode_point, point_to_bytes, scalar_from_bytes, scalar_to_bytes, Curve};
use crate::{Error, Result};
use elliptic_curve::ff::Field;
use rand_core::{CryptoRng, RngCore};

/// Dlog protocol over a fixed base point
#[derive(Debug, Clone, Copy)]
pub struct DlogProtocol<C: Curve> {
    base: C::Point,
}

impl<C: Curve> DlogProtocol<C> {
    pub fn new(base: C::Point) -> Self {
        Self { base }
    }

    /// Protocol over the curve generator
    pub fn generator() -> Self {
        Self::new(C::generator())
    }

    pub fn base(&self) -> &C::Point {
        &self.base
    }
}

/// Map a challenge string to a scalar, reading it as a big-endian integer
fn challenge_scalar<C: Curve>(challenge: &[u8]) -> Result<C::Scalar> {
    if challenge.is_empty() {
        return Err(Error::InvalidArgument("Empty challenge".into()));
    }
    let radix = C::Scalar::from(256u64);
    Ok(challenge
        .iter()
        .fold(C::Scalar::ZERO, |acc, byte| acc * radix + C::Scalar::from(*byte as u64)))
}

impl<C: Curve> SigmaProtocol for DlogProtocol<C> {
    type Statement = C::Point;
    type Witness = C::Scalar;
    type Commitment = C::Point;
    type State = C::Scalar;
    type Response = C::Scalar;

    const NAME: &'static str = "schnorr-dlog";

    fn commit<R: RngCore + CryptoRng>(
        &self,
        _statement: &C::Point,
        _witness: &C::Scalar,
        rng: &mut R,
    ) -> Result<(C::Point, C::Scalar)> {
        let nonce = C::Scalar::random(&mut *rng);
        Ok((self.base * nonce, nonce))
    }

    fn respond(
        &self,
        _statement: &C::Point,
        witness: &C::Scalar,
        nonce: &C::Scalar,
        challenge: &[u8],
    ) -> Result<C::Scalar> {
        let e = challenge_scalar::<C>(challenge)?;
        Ok(*nonce + e * witness)
    }

    fn verify(
        &self,
        statement: &C::Point,
        commitment: &C::Point,
        challenge: &[u8],
        response: &C::Scalar,
    ) -> Result<()> {
        let e = challenge_scalar::<C>(challenge)?;
        if self.base * response != *commitment + *statement * e {
            return Err(Error::VerificationFailed("Schnorr relation does not hold".into()));
        }
        Ok(())
    }

    fn statement_bytes(&self, statement: &C::Point) -> Vec<u8> {
        let mut bytes = point_to_bytes(&self.base);
        bytes.extend(point_to_bytes(statement));
        bytes
    }

    fn commitment_bytes(&self, commitment: &C::Point) -> Vec<u8> {
        point_to_bytes(commitment)
    }

    fn commitment_from_bytes(&self, bytes: &[u8]) -> Result<C::Point> {
        decode_point::<C>(bytes)
    }

    fn response_bytes(&self, response: &C::Scalar) -> Vec<u8> {
        scalar_to_bytes(response)
    }

    fn response_from_bytes(&self, bytes: &[u8]) -> Result<C::Scalar> {
        scalar_from_bytes(bytes)
    }
}
