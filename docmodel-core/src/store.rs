//! Main document store interface.
//!
//! A [`DocumentStore`] owns one [`Connection`] and hands out collections bound to it.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::store::DocumentStore;
//!
//! let store = DocumentStore::new(connector);
//! store.connect("localhost:27017/app").await?;
//!
//! let users = store.typed_collection::<User>();
//! let saved = users.insert(user).await?;
//!
//! store.disconnect().await?;
//! ```

use crate::{
    backend::{BackendConnector, StoreBackend},
    collection::{Collection, TypedCollection},
    config::{ConnectionOptions, ConnectionTarget},
    connection::{Connection, ConnectionStatus},
    document::Document,
    error::DocumentStoreResult,
};

/// A document store reached through a specific connector.
///
/// # Type Parameters
///
/// * `C` - The connector that opens backend sessions
#[derive(Debug)]
pub struct DocumentStore<C: BackendConnector> {
    connection: Connection<C>,
}

impl<C: BackendConnector> DocumentStore<C> {
    /// Creates a disconnected store.
    pub fn new(connector: C) -> Self {
        Self { connection: Connection::new(connector) }
    }

    /// Creates a disconnected store with explicit session options.
    pub fn with_options(connector: C, options: ConnectionOptions) -> Self {
        Self { connection: Connection::with_options(connector, options) }
    }

    /// Connects to `host:port/database`.
    ///
    /// Connecting again to the same target is a no-op.
    ///
    /// # Errors
    ///
    /// See [`Connection::connect_to`].
    pub async fn connect(&self, address: &str) -> DocumentStoreResult<()> {
        self.connection.connect(address).await
    }

    pub async fn connect_to(&self, target: ConnectionTarget) -> DocumentStoreResult<()> {
        self.connection.connect_to(target).await
    }

    /// Closes the session. Safe to call when not connected.
    pub async fn disconnect(&self) -> DocumentStoreResult<()> {
        self.connection.disconnect().await
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.connection.status().await
    }

    /// Returns the underlying connection handle.
    pub fn connection(&self) -> &Connection<C> {
        &self.connection
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, C, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.connection)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, C> {
        Collection::new(name.to_string(), &self.connection)
    }

    /// Lists all collections in the connected database.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not connected or the operation fails.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.connection
            .backend()
            .await?
            .list_collections()
            .await
    }

    /// Drops a collection and everything in it. Dropping a missing collection succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not connected or the operation fails.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.connection
            .backend()
            .await?
            .drop_collection(name)
            .await?;

        tracing::info!("Dropped collection {}", name);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::{connection::tests::CountingConnector, error::StoreError};

    #[tokio::test]
    async fn collections_follow_the_connection_lifecycle() {
        let store = DocumentStore::new(CountingConnector::default());
        let users = store.collection("users");

        assert!(users.count(doc! {}).await.unwrap_err().as_store() == Some(&StoreError::NotConnected));

        store.connect("localhost:27017/app").await.unwrap();
        assert_eq!(users.count(doc! {}).await.unwrap(), 0);

        store.disconnect().await.unwrap();
        assert!(users.count(doc! {}).await.is_err());
        assert_eq!(store.status().await, ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn admin_operations_require_a_connection() {
        let store = DocumentStore::new(CountingConnector::default());

        assert!(store.list_collections().await.is_err());
        assert!(store.drop_collection("users").await.is_err());

        store.connect("localhost/app").await.unwrap();
        assert!(store.list_collections().await.unwrap().is_empty());
        store.drop_collection("users").await.unwrap();
    }
}
