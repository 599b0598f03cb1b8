//! Feldman verifiable secret sharing
//!
//! Shamir sharing of a degree-`(t-1)` polynomial `f` plus public commitments
//! `C_k = a_k · G` to its coefficients. A holder of `(j, f(j))` checks
//! `f(j) · G == Σ_k C_k · j^k` without learning `f`.

use crate::curve::{msm, scalar_from_id, Curve};
use crate::{Error, Result, SharingId};
use elliptic_curve::{ff::Field, ff::PrimeField, group::Group};
use rand_core::{CryptoRng, RngCore};
use std::fmt;
use std::marker::PhantomData;
use zeroize::Zeroize;

/// One evaluation of a secret polynomial
#[derive(Clone)]
pub struct Share<C: Curve> {
    pub id: SharingId,
    pub value: C::Scalar,
}

impl<C: Curve> fmt::Debug for Share<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("id", &self.id)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl<C: Curve> Zeroize for Share<C> {
    fn zeroize(&mut self) {
        self.value = C::Scalar::ZERO;
    }
}

/// Splits secrets into `total` verifiable shares with reconstruction
/// threshold `threshold`
#[derive(Debug, Clone, Copy)]
pub struct Dealer<C: Curve> {
    threshold: usize,
    total: usize,
    _curve: PhantomData<C>,
}

impl<C: Curve> Dealer<C> {
    pub fn new(threshold: usize, total: usize) -> Result<Self> {
        if threshold < 1 {
            return Err(Error::InvalidConfig("Threshold must be at least 1".into()));
        }
        if threshold > total {
            return Err(Error::InvalidConfig(format!(
                "Threshold {} exceeds total parties {}",
                threshold, total
            )));
        }
        Ok(Self {
            threshold,
            total,
            _curve: PhantomData,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Share `secret`, or a fresh random secret when `None`.
    ///
    /// Returns the `t` coefficient commitments and the `n` shares, where
    /// `shares[j - 1]` belongs to sharing id `j`.
    pub fn split<R: RngCore + CryptoRng>(
        &self,
        secret: Option<C::Scalar>,
        rng: &mut R,
    ) -> Result<(Vec<C::Point>, Vec<Share<C>>)> {
        let constant = match secret {
            Some(secret) => secret,
            None => {
                let sample = C::Scalar::random(&mut *rng);
                if bool::from(sample.is_zero()) {
                    return Err(Error::Crypto("Rejected zero constant term".into()));
                }
                sample
            }
        };

        let mut coefficients = Vec::with_capacity(self.threshold);
        coefficients.push(constant);
        for _ in 1..self.threshold {
            coefficients.push(C::Scalar::random(&mut *rng));
        }

        let commitments = coefficients.iter().map(C::scalar_base_mul).collect();
        let shares = (1..=self.total)
            .map(|id| Share {
                id,
                value: evaluate_polynomial(&coefficients, &scalar_from_id(id)),
            })
            .collect();

        for coefficient in coefficients.iter_mut() {
            *coefficient = C::Scalar::ZERO;
        }

        Ok((commitments, shares))
    }
}

/// Evaluate `Σ a_k x^k` (Horner)
pub fn evaluate_polynomial<F: PrimeField>(coefficients: &[F], x: &F) -> F {
    coefficients
        .iter()
        .rev()
        .fold(F::ZERO, |acc, coefficient| acc * x + coefficient)
}

/// Evaluate a commitment vector in the exponent: `Σ C_k · x^k` (Horner).
///
/// This is the one place partial public keys are derived from commitments;
/// share verification and public-key-share construction both go through it.
pub fn evaluate_commitments<G: Group>(commitments: &[G], x: &G::Scalar) -> G {
    commitments
        .iter()
        .rev()
        .fold(G::identity(), |acc, commitment| acc * x + *commitment)
}

/// Check `share` against `commitments`, returning the partial public key
/// `share.value · G` on success
pub fn verify<C: Curve>(share: &Share<C>, commitments: &[C::Point]) -> Result<C::Point> {
    if share.id == 0 {
        return Err(Error::InvalidArgument("Sharing id 0 is not an evaluation point".into()));
    }
    if commitments.is_empty() {
        return Err(Error::InvalidArgument("Empty commitment vector".into()));
    }

    let expected = evaluate_commitments(commitments, &scalar_from_id(share.id));
    let actual = C::scalar_base_mul(&share.value);
    if actual != expected {
        return Err(Error::VerificationFailed(format!(
            "Share for sharing id {} is not on the committed polynomial",
            share.id
        )));
    }
    Ok(actual)
}

/// Lagrange basis coefficients for `ids`, evaluated at `at`
pub fn lagrange_coefficients<F: PrimeField>(ids: &[SharingId], at: &F) -> Result<Vec<F>> {
    if ids.is_empty() {
        return Err(Error::InvalidArgument("No sharing ids to interpolate".into()));
    }
    if ids.contains(&0) {
        return Err(Error::InvalidArgument("Sharing id 0 is not an evaluation point".into()));
    }

    let mut coefficients = Vec::with_capacity(ids.len());
    for (i, &id_i) in ids.iter().enumerate() {
        let x_i: F = scalar_from_id(id_i);
        let mut numerator = F::ONE;
        let mut denominator = F::ONE;

        for (j, &id_j) in ids.iter().enumerate() {
            if i == j {
                continue;
            }
            if id_i == id_j {
                return Err(Error::InvalidArgument(format!("Duplicate sharing id {}", id_i)));
            }
            let x_j: F = scalar_from_id(id_j);
            numerator *= *at - x_j;
            denominator *= x_i - x_j;
        }

        let inverse = Option::<F>::from(denominator.invert())
            .ok_or_else(|| Error::Internal("Lagrange denominator is zero".into()))?;
        coefficients.push(numerator * inverse);
    }

    Ok(coefficients)
}

/// Reconstruct `f(0)` from shares
pub fn combine<C: Curve>(shares: &[Share<C>]) -> Result<C::Scalar> {
    let ids: Vec<SharingId> = shares.iter().map(|share| share.id).collect();
    let coefficients = lagrange_coefficients::<C::Scalar>(&ids, &C::Scalar::ZERO)?;

    Ok(shares
        .iter()
        .zip(coefficients)
        .fold(C::Scalar::ZERO, |acc, (share, lambda)| acc + share.value * lambda))
}

/// Interpolate `f(at) · G` from points `(j, f(j) · G)`
pub fn interpolate_in_exponent<C: Curve>(
    points: &[(SharingId, C::Point)],
    at: &C::Scalar,
) -> Result<C::Point> {
    let ids: Vec<SharingId> = points.iter().map(|(id, _)| *id).collect();
    let coefficients = lagrange_coefficients::<C::Scalar>(&ids, at)?;
    let values: Vec<C::Point> = points.iter().map(|(_, point)| *point).collect();
    msm(&values, &coefficients)
}
