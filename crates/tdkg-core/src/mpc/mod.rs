//! MPC coordination utilities

use crate::{Result, SharingId};
use serde::{de::DeserializeOwned, Serialize};

pub use ::async_trait::async_trait;

/// Message relay trait for MPC communication
#[async_trait]
pub trait Relay: Send + Sync {
    /// Broadcast a message to all parties
    async fn broadcast<T: Serialize + Send + Sync>(
        &self,
        session_id: &[u8],
        round: u32,
        message: &T,
    ) -> Result<()>;

    /// Send a direct message to a specific party
    async fn send_direct<T: Serialize + Send + Sync>(
        &self,
        session_id: &[u8],
        round: u32,
        to: SharingId,
        message: &T,
    ) -> Result<()>;

    /// Collect `count` broadcast messages, the caller's own included
    async fn collect_broadcasts<T: DeserializeOwned + Send>(
        &self,
        session_id: &[u8],
        round: u32,
        count: usize,
    ) -> Result<Vec<T>>;

    /// Collect direct messages sent to this party
    async fn collect_direct<T: DeserializeOwned + Send>(
        &self,
        session_id: &[u8],
        round: u32,
        my_id: SharingId,
        count: usize,
    ) -> Result<Vec<T>>;
}

pub mod agree;
pub mod envelope;

/// In-memory relay for testing
pub mod memory;

pub use agree::agree_on_random;
pub use envelope::Envelope;
pub use memory::MemoryRelay;
