//! Opening sessions on the in-memory server.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use async_trait::async_trait;
use mea::mutex::Mutex;

use docmodel_core::{
    backend::BackendConnector,
    config::{ConnectionOptions, ConnectionTarget},
    error::{DocumentStoreResult, StoreError},
};

use crate::store::InMemoryStore;

/// Connector for an in-process "server".
///
/// Each distinct target (`host:port/database`) gets its own [`InMemoryStore`], kept for the
/// lifetime of the connector so that data survives a disconnect/connect cycle. Clones share
/// the same databases.
#[derive(Clone)]
pub struct InMemoryConnector {
    databases: Arc<Mutex<HashMap<ConnectionTarget, InMemoryStore>>>,
    unreachable: Arc<AtomicBool>,
    sessions: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self {
            databases: Arc::new(Mutex::new(HashMap::new())),
            unreachable: Arc::new(AtomicBool::new(false)),
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes subsequent connection attempts fail (or succeed again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of sessions opened so far.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Returns the store behind `target`, if a session to it was ever opened.
    pub async fn database(&self, target: &ConnectionTarget) -> Option<InMemoryStore> {
        self.databases.lock().await.get(target).cloned()
    }
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryConnector")
            .field("unreachable", &self.unreachable)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BackendConnector for InMemoryConnector {
    type Backend = InMemoryStore;

    async fn connect(&self, target: &ConnectionTarget, options: &ConnectionOptions) -> DocumentStoreResult<InMemoryStore> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(format!("{} is unreachable", target.server_uri())).into());
        }

        let store = self.databases
            .lock()
            .await
            .entry(target.clone())
            .or_default()
            .clone();

        let session = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            "Opened in-memory session {} to {} for {}",
            session,
            target,
            options.app_name.as_deref().unwrap_or("unnamed client")
        );

        Ok(store)
    }
}
