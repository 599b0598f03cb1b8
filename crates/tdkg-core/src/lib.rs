//! # tdkg core
//!
//! Threshold distributed key generation over prime-order groups.
//!
//! This crate provides:
//! - Sharing-id derivation from participant identity keys
//! - Feldman verifiable secret sharing
//! - Proofs of knowledge compiled with the randomised Fischlin transform
//! - A two-round DKG participant and an async driver over a message relay
//!
//! ## Protocol Overview
//!
//! Every party deals a Feldman sharing of a fresh secret and proves knowledge
//! of it. After checking all peers, each party holds a Shamir share of the
//! sum of the dealt secrets; any `t` of them can reconstruct it and no `t-1`
//! learn anything about it. A misbehaving peer is named in the abort.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tdkg_core::{keygen, curve::Secp256k1, mpc::MemoryRelay, SessionConfig};
//!
//! let config = SessionConfig::new(session_id, 2, identities)?;
//! let key_share = keygen::run_dkg::<Secp256k1, _, _, _>(&auth_key, config, rng, &relay).await?;
//! ```

pub mod curve;
pub mod error;
pub mod identity;
pub mod keygen;
pub mod mpc;
pub mod proofs;
pub mod sharing;
pub mod transcript;
pub mod types;

pub use error::{Error, ErrorClass, Result};
pub use types::{KeyShare, PublicKeyShares, SessionConfig, SessionId, SharingId, SigningKeyShare};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default threshold for a 3-party setup
pub const DEFAULT_THRESHOLD: usize = 2;

/// Default number of parties
pub const DEFAULT_PARTIES: usize = 3;
