//! Sharing-id derivation
//!
//! Every party sorts the full participant set by canonical key encoding and
//! numbers it `1..=n`. The result is the only source of polynomial
//! evaluation points, so it must come out identical for everyone.

use crate::identity::IdentityKey;
use crate::{Error, Result, SharingId};
use std::collections::BTreeMap;

/// Bijection between sharing ids and identity keys
#[derive(Debug, Clone)]
pub struct SharingConfig<I: IdentityKey> {
    by_id: BTreeMap<SharingId, I>,
}

/// Sort `identities` into sharing ids and locate `mine` among them
pub fn derive_sharing_ids<I: IdentityKey>(
    identities: &[I],
    mine: Option<&I>,
) -> Result<(SharingConfig<I>, Option<SharingId>)> {
    let config = SharingConfig::derive(identities)?;
    let my_id = mine.and_then(|identity| config.sharing_id(identity));
    Ok((config, my_id))
}

impl<I: IdentityKey> SharingConfig<I> {
    pub fn derive(identities: &[I]) -> Result<Self> {
        if identities.is_empty() {
            return Err(Error::InvalidArgument("No participants".into()));
        }

        let mut sorted: Vec<(Vec<u8>, &I)> = identities
            .iter()
            .map(|identity| (identity.to_bytes(), identity))
            .collect();
        sorted.sort_by(|(a, _), (b, _)| I::ORDERING.compare(a, b));

        if sorted.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(Error::InvalidArgument("Duplicate identity key".into()));
        }

        let by_id = sorted
            .into_iter()
            .enumerate()
            .map(|(index, (_, identity))| (index + 1, identity.clone()))
            .collect();

        Ok(Self { by_id })
    }

    pub fn sharing_id(&self, identity: &I) -> Option<SharingId> {
        self.by_id
            .iter()
            .find(|(_, candidate)| *candidate == identity)
            .map(|(id, _)| *id)
    }

    pub fn identity(&self, id: SharingId) -> Option<&I> {
        self.by_id.get(&id)
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Sharing ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = SharingId> + '_ {
        self.by_id.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SharingId, &I)> {
        self.by_id.iter().map(|(id, identity)| (*id, identity))
    }
}
