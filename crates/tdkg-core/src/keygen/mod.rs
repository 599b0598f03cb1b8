//! Distributed Key Generation (DKG) module
//!
//! [`Participant`] is the synchronous two-round state machine; [`run_dkg`]
//! drives one participant over a [`Relay`](crate::mpc::Relay).

mod dkg;
mod messages;
mod participant;

pub use dkg::run_dkg;
pub use messages::*;
pub use participant::{Participant, Round1Output, State};
