//! Zero-knowledge proofs
//!
//! - [`sigma`]: the interactive protocol interface
//! - [`schnorr`]: knowledge of a discrete logarithm
//! - [`fischlin`]: the non-interactive compiler

pub mod fischlin;
pub mod schnorr;
pub mod sigma;

pub use fischlin::{Compiler, FischlinProof, Prover, Verifier};
pub use schnorr::DlogProtocol;
pub use sigma::SigmaProtocol;
