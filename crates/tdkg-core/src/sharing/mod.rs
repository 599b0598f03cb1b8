//! Secret sharing: sharing-id derivation and Feldman VSS

pub mod config;
pub mod feldman;

pub use config::{derive_sharing_ids, SharingConfig};
pub use feldman::{Dealer, Share};
