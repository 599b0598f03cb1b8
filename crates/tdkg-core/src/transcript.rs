//! Fiat–Shamir transcript helpers on top of `merlin`

use crate::curve::point_to_bytes;
use crate::SharingId;
use elliptic_curve::group::GroupEncoding;
use merlin::Transcript;

/// Domain-separated appends used by the proofs and the DKG
pub trait TranscriptProtocol {
    /// Append each point under the same label, prefixed by the count
    fn append_points<G: GroupEncoding>(&mut self, label: &'static [u8], points: &[G]);

    fn append_sharing_id(&mut self, label: &'static [u8], id: SharingId);

    /// Extract a fixed-size challenge
    fn challenge_array<const N: usize>(&mut self, label: &'static [u8]) -> [u8; N];
}

impl TranscriptProtocol for Transcript {
    fn append_points<G: GroupEncoding>(&mut self, label: &'static [u8], points: &[G]) {
        self.append_u64(label, points.len() as u64);
        for point in points {
            self.append_message(label, &point_to_bytes(point));
        }
    }

    fn append_sharing_id(&mut self, label: &'static [u8], id: SharingId) {
        self.append_u64(label, id as u64);
    }

    fn challenge_array<const N: usize>(&mut self, label: &'static [u8]) -> [u8; N] {
        let mut out = [0u8; N];
        self.challenge_bytes(label, &mut out);
        out
    }
}
