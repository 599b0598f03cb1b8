//! Core types for the DKG protocol

use crate::curve::{point_map_serde, point_serde, points_serde, scalar_from_id, scalar_serde, Curve};
use crate::identity::IdentityKey;
use crate::sharing::feldman::{evaluate_commitments, interpolate_in_exponent};
use crate::sharing::SharingConfig;
use crate::{Error, Result};
use elliptic_curve::{ff::Field, group::Group};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroize;

/// Position of a party as a polynomial evaluation point (`1..=n`)
pub type SharingId = usize;

/// Unique identifier for a protocol execution
pub type SessionId = Vec<u8>;

/// Configuration for one DKG execution
#[derive(Debug, Clone)]
pub struct SessionConfig<I: IdentityKey> {
    /// Session identifier; must never be reused across executions
    pub session_id: SessionId,

    /// Threshold (t-of-n)
    pub threshold: usize,

    /// All participants, in any order
    pub participants: Vec<I>,
}

impl<I: IdentityKey> SessionConfig<I> {
    /// Create a validated session configuration
    pub fn new(session_id: SessionId, threshold: usize, participants: Vec<I>) -> Result<Self> {
        let config = Self {
            session_id,
            threshold,
            participants,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_id.is_empty() {
            return Err(Error::InvalidConfig("Session id cannot be empty".into()));
        }
        if self.threshold < 2 {
            return Err(Error::InvalidConfig("Threshold must be at least 2".into()));
        }
        if self.threshold > self.participants.len() {
            return Err(Error::InvalidConfig(
                "Threshold cannot exceed number of parties".into(),
            ));
        }
        SharingConfig::derive(&self.participants)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(())
    }

    /// Total number of parties
    pub fn n_parties(&self) -> usize {
        self.participants.len()
    }

    pub fn sharing_config(&self) -> Result<SharingConfig<I>> {
        SharingConfig::derive(&self.participants)
    }
}

/// A party's additive share of the group secret and the group public key
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SigningKeyShare<C: Curve> {
    #[serde(with = "scalar_serde")]
    pub share: C::Scalar,

    #[serde(with = "point_serde")]
    pub public_key: C::Point,
}

impl<C: Curve> SigningKeyShare<C> {
    /// `share · G`
    pub fn public_key_share(&self) -> C::Point {
        C::scalar_base_mul(&self.share)
    }
}

impl<C: Curve> fmt::Debug for SigningKeyShare<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyShare")
            .field("share", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl<C: Curve> Zeroize for SigningKeyShare<C> {
    fn zeroize(&mut self) {
        self.share = C::Scalar::ZERO;
    }
}

impl<C: Curve> Drop for SigningKeyShare<C> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Public verification data of a completed DKG
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PublicKeyShares<C: Curve> {
    /// Group public key
    #[serde(with = "point_serde")]
    pub public_key: C::Point,

    /// Partial public key of every sharing id
    #[serde(with = "point_map_serde")]
    pub shares: BTreeMap<SharingId, C::Point>,

    /// Feldman commitment vector of the party at sharing id 1
    #[serde(with = "points_serde")]
    pub feldman_commitments: Vec<C::Point>,
}

impl<C: Curve> PublicKeyShares<C> {
    /// Build the partial public keys of `ids` from every party's commitment
    /// vector.
    ///
    /// The vectors are summed coefficient-wise first; by linearity the result
    /// evaluated at `j` equals the sum of each vector evaluated at `j`.
    pub fn from_commitment_vectors(
        vectors: &BTreeMap<SharingId, Vec<C::Point>>,
        ids: impl IntoIterator<Item = SharingId>,
    ) -> Result<Self> {
        let first = vectors
            .get(&1)
            .ok_or_else(|| Error::Missing("commitment vector of sharing id 1".into()))?;
        let threshold = first.len();

        let mut aggregate = vec![C::Point::identity(); threshold];
        for (id, vector) in vectors {
            if vector.len() != threshold {
                return Err(Error::InvalidArgument(format!(
                    "Commitment vector of sharing id {} has length {}, expected {}",
                    id,
                    vector.len(),
                    threshold
                )));
            }
            for (sum, commitment) in aggregate.iter_mut().zip(vector) {
                *sum += commitment;
            }
        }

        let mut shares = BTreeMap::new();
        for id in ids {
            let share = evaluate_commitments(&aggregate, &scalar_from_id(id));
            if bool::from(share.is_identity()) {
                return Err(Error::VerificationFailed(format!(
                    "Public key share of sharing id {} is the identity",
                    id
                )));
            }
            shares.insert(id, share);
        }

        Ok(Self {
            public_key: aggregate[0],
            shares,
            feldman_commitments: first.clone(),
        })
    }

    pub fn share(&self, id: SharingId) -> Option<&C::Point> {
        self.shares.get(&id)
    }

    /// Check that the partial public keys lie on one polynomial of degree
    /// `threshold - 1` whose value at 0 is the group public key
    pub fn validate(&self, threshold: usize) -> Result<()> {
        if threshold == 0 || self.shares.len() < threshold {
            return Err(Error::VerificationFailed(format!(
                "{} public key shares cannot satisfy threshold {}",
                self.shares.len(),
                threshold
            )));
        }
        if bool::from(self.public_key.is_identity()) {
            return Err(Error::VerificationFailed("Public key is the identity".into()));
        }
        if self.feldman_commitments.len() != threshold {
            return Err(Error::VerificationFailed(format!(
                "Feldman commitment vector has length {}, expected {}",
                self.feldman_commitments.len(),
                threshold
            )));
        }

        let basis: Vec<(SharingId, C::Point)> = self
            .shares
            .iter()
            .take(threshold)
            .map(|(id, point)| (*id, *point))
            .collect();

        if interpolate_in_exponent::<C>(&basis, &C::Scalar::ZERO)? != self.public_key {
            return Err(Error::VerificationFailed(
                "Public key shares do not interpolate to the public key".into(),
            ));
        }
        for (id, point) in self.shares.iter().skip(threshold) {
            if interpolate_in_exponent::<C>(&basis, &scalar_from_id(*id))? != *point {
                return Err(Error::VerificationFailed(format!(
                    "Public key share of sharing id {} is off the polynomial",
                    id
                )));
            }
        }
        Ok(())
    }
}

/// Everything a party keeps after a successful DKG
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct KeyShare<C: Curve> {
    /// Curve name, checked on load
    pub curve: String,

    /// This party's sharing id
    pub sharing_id: SharingId,

    /// Threshold
    pub threshold: usize,

    /// Total number of parties
    pub n_parties: usize,

    pub signing_key_share: SigningKeyShare<C>,

    pub public_key_shares: PublicKeyShares<C>,
}

impl<C: Curve> KeyShare<C> {
    /// Compressed group public key, hex encoded
    pub fn public_key_hex(&self) -> String {
        hex::encode(crate::curve::point_to_bytes(&self.signing_key_share.public_key))
    }

    /// Parse a persisted key share, rejecting other curves
    pub fn from_json(json: &str) -> Result<Self> {
        let key_share: Self =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        if key_share.curve != C::NAME {
            return Err(Error::Deserialization(format!(
                "Key share is for curve {}, expected {}",
                key_share.curve,
                C::NAME
            )));
        }
        Ok(key_share)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
