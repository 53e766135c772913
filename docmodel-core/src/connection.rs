//! Connection lifecycle.
//!
//! A [`Connection`] is an explicit handle to one store session. It moves through
//! `Disconnected -> Connecting -> Connected -> Disconnected`:
//!
//! - `connect` with the target already connected is a no-op;
//! - `connect` with a different target while connected fails with
//!   [`StoreError::AlreadyConnected`];
//! - `disconnect` is safe to call in any state;
//! - operations on a handle that is not connected fail with [`StoreError::NotConnected`]
//!   instead of being queued.
//!
//! Lifecycle calls are serialized. Operations only hold the state lock long enough to
//! clone the session handle, so they run concurrently with each other.

use mea::{mutex::Mutex, rwlock::RwLock};
use std::{fmt, sync::Arc};

use crate::{
    backend::{BackendConnector, StoreBackend},
    config::{ConnectionOptions, ConnectionTarget},
    error::{DocumentStoreResult, StoreError},
};

/// Observable lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

enum ConnectionState<B> {
    Disconnected,
    Connecting(ConnectionTarget),
    Connected {
        target: ConnectionTarget,
        backend: Arc<B>,
    },
}

/// Handle to a single document store session.
pub struct Connection<C: BackendConnector> {
    connector: C,
    options: ConnectionOptions,
    state: RwLock<ConnectionState<C::Backend>>,
    lifecycle: Mutex<()>,
}

impl<C: BackendConnector> Connection<C> {
    /// Creates a disconnected handle with default options.
    pub fn new(connector: C) -> Self {
        Self::with_options(connector, ConnectionOptions::default())
    }

    /// Creates a disconnected handle.
    pub fn with_options(connector: C, options: ConnectionOptions) -> Self {
        Self {
            connector,
            options,
            state: RwLock::new(ConnectionState::Disconnected),
            lifecycle: Mutex::new(()),
        }
    }

    /// Connects to an address of the form `host:port/database`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a malformed address, or any error of
    /// [`Connection::connect_to`].
    pub async fn connect(&self, address: &str) -> DocumentStoreResult<()> {
        self.connect_to(ConnectionTarget::parse(address)?).await
    }

    /// Opens the session if the handle is not connected yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyConnected`] if a session to another target is open, or
    /// the connector's error if the store cannot be reached. A failed attempt leaves the
    /// handle disconnected.
    pub async fn connect_to(&self, target: ConnectionTarget) -> DocumentStoreResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if let ConnectionState::Connected { target: current, .. } = &*self.state.read().await {
            if *current == target {
                tracing::debug!("Already connected to {}", target);
                return Ok(());
            }

            tracing::warn!("Refusing to connect to {} while connected to {}", target, current);
            return Err(StoreError::AlreadyConnected(current.to_string(), target.to_string()).into());
        }

        *self.state.write().await = ConnectionState::Connecting(target.clone());
        tracing::info!("Connecting to {}", target);

        match self.connector.connect(&target, &self.options).await {
            Ok(backend) => {
                tracing::info!("Connected to {}", target);
                *self.state.write().await = ConnectionState::Connected {
                    target,
                    backend: Arc::new(backend),
                };
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Failed to connect to {}: {}", target, err);
                *self.state.write().await = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Closes the session, if any.
    ///
    /// # Errors
    ///
    /// Returns the backend's shutdown error. The handle is disconnected either way.
    pub async fn disconnect(&self) -> DocumentStoreResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let previous = std::mem::replace(&mut *self.state.write().await, ConnectionState::Disconnected);

        match previous {
            ConnectionState::Connected { target, backend } => {
                backend.shutdown().await?;
                tracing::info!("Disconnected from {}", target);
            }
            _ => tracing::debug!("Disconnect requested while not connected"),
        }

        Ok(())
    }

    /// Returns the live session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotConnected`] unless the handle is connected.
    pub async fn backend(&self) -> DocumentStoreResult<Arc<C::Backend>> {
        match &*self.state.read().await {
            ConnectionState::Connected { backend, .. } => Ok(Arc::clone(backend)),
            _ => Err(StoreError::NotConnected.into()),
        }
    }

    pub async fn status(&self) -> ConnectionStatus {
        match &*self.state.read().await {
            ConnectionState::Disconnected => ConnectionStatus::Disconnected,
            ConnectionState::Connecting(_) => ConnectionStatus::Connecting,
            ConnectionState::Connected { .. } => ConnectionStatus::Connected,
        }
    }

    /// Returns the target of the open (or opening) session.
    pub async fn target(&self) -> Option<ConnectionTarget> {
        match &*self.state.read().await {
            ConnectionState::Disconnected => None,
            ConnectionState::Connecting(target) | ConnectionState::Connected { target, .. } => {
                Some(target.clone())
            }
        }
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: BackendConnector> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connector", &self.connector)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
