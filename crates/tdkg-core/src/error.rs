//! Error types for DKG operations
//!
//! Every failure falls into one of three classes (see [`ErrorClass`]):
//! local validation errors the caller can correct and retry, identifiable
//! aborts that blame one sharing id, and total aborts with no attribution.

use crate::SharingId;
use thiserror::Error;

/// Result type alias for DKG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input, wrong round or missing argument. Retrying with
    /// corrected input is possible.
    Local,
    /// The protocol cannot continue and a specific party is to blame.
    IdentifiableAbort,
    /// The protocol cannot continue and nobody in particular is to blame.
    TotalAbort,
}

/// Errors that can occur during DKG protocol execution
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid protocol configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid argument to an operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A round function was called out of order
    #[error("Round mismatch: expected {expected}, participant is {actual}")]
    InvalidRound {
        expected: &'static str,
        actual: &'static str,
    },

    /// Required input is absent
    #[error("Missing: {0}")]
    Missing(String),

    /// A share, proof or signature did not verify
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// A specific party misbehaved
    #[error("Identifiable abort (sharing id {sharing_id}): {reason}")]
    IdentifiableAbort { sharing_id: SharingId, reason: String },

    /// Protocol-wide inconsistency with no single attributable party
    #[error("Total abort: {0}")]
    TotalAbort(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Network/relay error
    #[error("Relay error: {0}")]
    Relay(String),

    /// Timeout waiting for message
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Blame `sharing_id` for `reason`
    pub fn abort(sharing_id: SharingId, reason: impl Into<String>) -> Self {
        Error::IdentifiableAbort {
            sharing_id,
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::IdentifiableAbort { .. } => ErrorClass::IdentifiableAbort,
            Error::TotalAbort(_) => ErrorClass::TotalAbort,
            _ => ErrorClass::Local,
        }
    }

    /// Whether the protocol execution must be abandoned
    pub fn is_abort(&self) -> bool {
        self.class() != ErrorClass::Local
    }

    /// The sharing id blamed by an identifiable abort
    pub fn blamed(&self) -> Option<SharingId> {
        match self {
            Error::IdentifiableAbort { sharing_id, .. } => Some(*sharing_id),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
