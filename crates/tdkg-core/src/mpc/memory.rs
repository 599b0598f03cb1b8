//! In-memory relay implementation for testing

use super::{async_trait, Relay};
use crate::{Error, Result, SharingId};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Collection timeout used by [`MemoryRelay::new`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// In-memory message relay for local testing.
///
/// Owned by the caller and shared between the parties of one run, usually
/// behind an `Arc`. Nothing is global: two relays never see each other's
/// messages.
pub struct MemoryRelay {
    /// Broadcast messages: (session_id, round) -> Vec<message_bytes>
    broadcasts: Arc<DashMap<(Vec<u8>, u32), Vec<Vec<u8>>>>,
    /// Direct messages: (session_id, round, to) -> Vec<message_bytes>
    directs: Arc<DashMap<(Vec<u8>, u32, SharingId), Vec<Vec<u8>>>>,
    /// Notification channel
    notify: broadcast::Sender<()>,
    timeout: Duration,
}

impl MemoryRelay {
    /// Create a new in-memory relay
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Relay whose collect calls give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        let (notify, _) = broadcast::channel(100);
        Self {
            broadcasts: Arc::new(DashMap::new()),
            directs: Arc::new(DashMap::new()),
            notify,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

impl MemoryRelay {
    /// Wait until `take` yields, polling on every notification
    async fn wait_for<T, F>(&self, what: String, mut take: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
        F: FnMut() -> Option<Result<Vec<T>>> + Send,
    {
        let mut rx = self.notify.subscribe();
        let poll = async {
            loop {
                if let Some(result) = take() {
                    return result;
                }

                tokio::select! {
                    _ = rx.recv() => continue,
                    _ = tokio::time::sleep(Duration::from_millis(100)) => continue,
                }
            }
        };

        tokio::time::timeout(self.timeout, poll)
            .await
            .map_err(|_| Error::Timeout(what))?
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn broadcast<T: Serialize + Send + Sync>(
        &self,
        session_id: &[u8],
        round: u32,
        message: &T,
    ) -> Result<()> {
        let bytes = serialize(message)?;

        self.broadcasts
            .entry((session_id.to_vec(), round))
            .or_default()
            .push(bytes);

        let _ = self.notify.send(());
        Ok(())
    }

    async fn send_direct<T: Serialize + Send + Sync>(
        &self,
        session_id: &[u8],
        round: u32,
        to: SharingId,
        message: &T,
    ) -> Result<()> {
        let bytes = serialize(message)?;

        self.directs
            .entry((session_id.to_vec(), round, to))
            .or_default()
            .push(bytes);

        let _ = self.notify.send(());
        Ok(())
    }

    async fn collect_broadcasts<T: DeserializeOwned + Send>(
        &self,
        session_id: &[u8],
        round: u32,
        count: usize,
    ) -> Result<Vec<T>> {
        let key = (session_id.to_vec(), round);
        self.wait_for(format!("{} round {} broadcasts", count, round), || {
            let messages = self.broadcasts.get(&key)?;
            if messages.len() < count {
                return None;
            }
            Some(messages.iter().take(count).map(|bytes| deserialize(bytes)).collect())
        })
        .await
    }

    async fn collect_direct<T: DeserializeOwned + Send>(
        &self,
        session_id: &[u8],
        round: u32,
        my_id: SharingId,
        count: usize,
    ) -> Result<Vec<T>> {
        let key = (session_id.to_vec(), round, my_id);
        self.wait_for(format!("{} round {} direct messages", count, round), || {
            let messages = self.directs.get(&key)?;
            if messages.len() < count {
                return None;
            }
            Some(messages.iter().take(count).map(|bytes| deserialize(bytes)).collect())
        })
        .await
    }
}
