//! DKG message types

use crate::proofs::fischlin::{FischlinProof, R};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Round 1 broadcast: commitments to the polynomial coefficients and a proof
/// of knowledge of the constant term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round1Broadcast {
    /// Feldman commitments `C_0..C_{t-1}`, compressed
    pub commitments: Vec<Vec<u8>>,
    /// Proof of knowledge of `log_G(C_0)`
    pub proof: FischlinProof,
}

impl Round1Broadcast {
    /// Structural checks, run by the message layer before delivery
    pub fn validate(&self, threshold: usize) -> Result<()> {
        if self.commitments.len() != threshold {
            return Err(Error::InvalidArgument(format!(
                "Expected {} commitments, got {}",
                threshold,
                self.commitments.len()
            )));
        }
        if self.commitments.iter().any(|c| c.is_empty()) {
            return Err(Error::InvalidArgument("Empty commitment".into()));
        }
        if self.proof.commitments.len() != R
            || self.proof.challenges.len() != R
            || self.proof.responses.len() != R
        {
            return Err(Error::InvalidArgument(format!(
                "Proof must carry {} repetitions",
                R
            )));
        }
        Ok(())
    }
}

/// Round 1 point-to-point message: the recipient's share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round1P2P {
    pub share: Vec<u8>,
}

impl Round1P2P {
    pub fn validate(&self, _threshold: usize) -> Result<()> {
        if self.share.is_empty() {
            return Err(Error::InvalidArgument("Empty share".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof(repetitions: usize) -> FischlinProof {
        FischlinProof {
            commitments: vec![vec![2; 33]; repetitions],
            challenges: vec![vec![0; 2]; repetitions],
            responses: vec![vec![0; 32]; repetitions],
        }
    }

    #[test]
    fn test_broadcast_validate() {
        let message = Round1Broadcast {
            commitments: vec![vec![2; 33]; 3],
            proof: proof(R),
        };
        message.validate(3).unwrap();
        assert!(message.validate(2).is_err());

        let short_proof = Round1Broadcast {
            proof: proof(R - 1),
            ..message.clone()
        };
        assert!(short_proof.validate(3).is_err());

        let mut empty = message;
        empty.commitments[1].clear();
        assert!(empty.validate(3).is_err());
    }

    #[test]
    fn test_p2p_validate() {
        assert!(Round1P2P { share: vec![] }.validate(2).is_err());
        Round1P2P { share: vec![1; 32] }.validate(2).unwrap();
    }
}
