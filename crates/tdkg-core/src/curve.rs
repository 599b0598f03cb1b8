//! Algebra capability
//!
//! The protocol code is written against [`Curve`], which pairs a prime-order
//! group with its scalar field using the `ff`/`group` traits re-exported by
//! `elliptic-curve`. Two instances are provided: [`Secp256k1`] and
//! [`Ed25519`].

use crate::{Error, Result, SharingId};
use elliptic_curve::{
    ff::PrimeField,
    group::{Group, GroupEncoding},
};
use std::fmt::Debug;

/// A prime-order group together with its scalar field
pub trait Curve: Copy + Clone + Debug + Default + PartialEq + Eq + Send + Sync + 'static {
    /// Scalar field element
    type Scalar: PrimeField;
    /// Group element
    type Point: Group<Scalar = Self::Scalar> + GroupEncoding;

    /// Curve name, used for persistence and logging
    const NAME: &'static str;

    /// Whether `point` lies in the prime-order subgroup.
    ///
    /// Only curves with a cofactor need to override this.
    fn is_prime_order(_point: &Self::Point) -> bool {
        true
    }

    fn generator() -> Self::Point {
        Self::Point::generator()
    }

    /// `scalar · G`
    fn scalar_base_mul(scalar: &Self::Scalar) -> Self::Point {
        Self::generator() * scalar
    }
}

/// secp256k1 (k256)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Secp256k1;

impl Curve for Secp256k1 {
    type Scalar = k256::Scalar;
    type Point = k256::ProjectivePoint;

    const NAME: &'static str = "secp256k1";
}

/// Edwards25519 (curve25519-dalek). Decoding rejects torsion components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ed25519;

impl Curve for Ed25519 {
    type Scalar = curve25519_dalek::Scalar;
    type Point = curve25519_dalek::EdwardsPoint;

    const NAME: &'static str = "ed25519";

    fn is_prime_order(point: &Self::Point) -> bool {
        point.is_torsion_free()
    }
}

/// Canonical compressed encoding of a point
pub fn point_to_bytes<G: GroupEncoding>(point: &G) -> Vec<u8> {
    point.to_bytes().as_ref().to_vec()
}

fn point_from_bytes<G: GroupEncoding>(bytes: &[u8]) -> Result<G> {
    let mut repr = G::Repr::default();
    if repr.as_ref().len() != bytes.len() {
        return Err(Error::Deserialization(format!(
            "Invalid point length {}",
            bytes.len()
        )));
    }
    repr.as_mut().copy_from_slice(bytes);
    Option::<G>::from(G::from_bytes(&repr))
        .ok_or_else(|| Error::Deserialization("Invalid point encoding".into()))
}

/// Decode a point and require it to lie in the prime-order subgroup
pub fn decode_point<C: Curve>(bytes: &[u8]) -> Result<C::Point> {
    let point = point_from_bytes::<C::Point>(bytes)?;
    if !C::is_prime_order(&point) {
        return Err(Error::VerificationFailed(format!(
            "{} point outside the prime-order subgroup",
            C::NAME
        )));
    }
    Ok(point)
}

/// Canonical encoding of a scalar
pub fn scalar_to_bytes<F: PrimeField>(scalar: &F) -> Vec<u8> {
    scalar.to_repr().as_ref().to_vec()
}

/// Decode a canonically encoded scalar
pub fn scalar_from_bytes<F: PrimeField>(bytes: &[u8]) -> Result<F> {
    let mut repr = F::Repr::default();
    if repr.as_ref().len() != bytes.len() {
        return Err(Error::Deserialization(format!(
            "Invalid scalar length {}",
            bytes.len()
        )));
    }
    repr.as_mut().copy_from_slice(bytes);
    Option::<F>::from(F::from_repr(repr))
        .ok_or_else(|| Error::Deserialization("Non-canonical scalar encoding".into()))
}

/// The evaluation point of a sharing id
pub fn scalar_from_id<F: PrimeField>(id: SharingId) -> F {
    F::from(id as u64)
}

/// Multi-scalar multiplication `Σ scalars[i] · points[i]`
pub fn msm<G: Group>(points: &[G], scalars: &[G::Scalar]) -> Result<G> {
    if points.len() != scalars.len() {
        return Err(Error::InvalidArgument(format!(
            "msm length mismatch: {} points, {} scalars",
            points.len(),
            scalars.len()
        )));
    }
    Ok(points
        .iter()
        .zip(scalars)
        .fold(G::identity(), |acc, (point, scalar)| acc + *point * scalar))
}

/// Serde adapter for a single scalar (canonical bytes)
pub mod scalar_serde {
    use elliptic_curve::ff::PrimeField;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<F: PrimeField, S: Serializer>(
        scalar: &F,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(scalar.to_repr().as_ref())
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<F, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        super::scalar_from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a single point (compressed bytes)
pub mod point_serde {
    use elliptic_curve::group::GroupEncoding;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<G: GroupEncoding, S: Serializer>(
        point: &G,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(point.to_bytes().as_ref())
    }

    pub fn deserialize<'de, G: GroupEncoding, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<G, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        super::point_from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a vector of points
pub mod points_serde {
    use elliptic_curve::group::GroupEncoding;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<G: GroupEncoding, S: Serializer>(
        points: &[G],
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let encoded: Vec<Vec<u8>> = points.iter().map(super::point_to_bytes).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, G: GroupEncoding, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<G>, D::Error> {
        let encoded: Vec<Vec<u8>> = Vec::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|bytes| super::point_from_bytes(bytes).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Serde adapter for a sharing-id keyed map of points
pub mod point_map_serde {
    use crate::SharingId;
    use elliptic_curve::group::GroupEncoding;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<G: GroupEncoding, S: Serializer>(
        points: &BTreeMap<SharingId, G>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let encoded: BTreeMap<SharingId, Vec<u8>> = points
            .iter()
            .map(|(id, point)| (*id, super::point_to_bytes(point)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, G: GroupEncoding, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<SharingId, G>, D::Error> {
        let encoded: BTreeMap<SharingId, Vec<u8>> = BTreeMap::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(id, bytes)| {
                super::point_from_bytes(&bytes)
                    .map(|point| (id, point))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
