//! Storage backend abstraction.
//!
//! A backend is one live session with a document store. Backends are produced by a
//! [`BackendConnector`] when a [`Connection`](crate::connection::Connection) is opened and are
//! dropped (after [`StoreBackend::shutdown`]) when it is closed.
//!
//! # Contract
//!
//! - Queries reaching a backend have already been cast; identifier paths hold native
//!   ObjectIds.
//! - Zero matches is a successful, empty result.
//! - Every failure to reach or use the store is reported as a
//!   [`StoreError`](crate::error::StoreError).
//!
//! # Examples
//!
//! ```ignore
//! use docmodel::backend::{StoreBackend, WriteScope};
//! use bson::doc;
//!
//! let written = backend.insert_documents(vec![doc! { "_id": id, "name": "Alice" }], "users").await?;
//! let status = backend
//!     .update_documents(Filter::id(id).into(), doc! { "name": "Bob" }, WriteScope::One, "users")
//!     .await?;
//! ```

use async_trait::async_trait;
use bson::Document as BsonDocument;
use futures::stream::BoxStream;
use std::fmt::Debug;

use crate::{
    config::{ConnectionOptions, ConnectionTarget},
    error::DocumentStoreResult,
    id::ObjectId,
    query::Query,
};

/// A lazily materialized sequence of stored documents.
pub type DocumentStream = BoxStream<'static, DocumentStoreResult<BsonDocument>>;

/// How many matching documents a write may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    /// The first match only.
    One,
    /// Every match.
    Many,
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStatus {
    /// Documents that matched the filter.
    pub matched_count: u64,
    /// Documents whose content actually changed.
    pub modified_count: u64,
}

/// Outcome of a removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteStatus {
    pub deleted_count: u64,
}

/// One session with a document store.
///
/// # Thread Safety
///
/// Implementations are shared behind an `Arc` and called from concurrent tasks. Writes to a
/// single document must be atomic; ordering between concurrent writers is whatever the
/// store provides.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug + 'static {
    /// Inserts documents, each carrying its own `_id`.
    ///
    /// Fails with [`StoreError::DuplicateKey`](crate::error::StoreError::DuplicateKey) without
    /// writing anything if an identifier is already stored or repeats within the batch.
    ///
    /// Stores that cannot check and write in one step check first. A concurrent writer taking
    /// an identifier in between is still reported as `DuplicateKey`, and the documents before
    /// it in the batch may then have been written.
    ///
    /// # Returns
    ///
    /// The number of documents written.
    async fn insert_documents(
        &self,
        documents: Vec<BsonDocument>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;

    /// Returns the documents matching `query`, honoring sort, offset and limit.
    async fn find_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<BsonDocument>>;

    /// Opens a cursor over the documents matching `query`.
    ///
    /// The stream must not load the whole result set up front, and must release its
    /// server-side resources when dropped.
    async fn stream_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<DocumentStream>;

    /// Applies `patch` as a partial (`$set`-style) update to the matching documents.
    ///
    /// Keys of `patch` may be dotted paths into nested documents. Fields not named in the
    /// patch are left untouched.
    async fn update_documents(
        &self,
        query: Query,
        patch: BsonDocument,
        scope: WriteScope,
        collection: &str,
    ) -> DocumentStoreResult<UpdateStatus>;

    /// Counts the documents matching `query` at call time.
    async fn count_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<u64>;

    /// Removes the matching documents.
    async fn delete_documents(
        &self,
        query: Query,
        scope: WriteScope,
        collection: &str,
    ) -> DocumentStoreResult<DeleteStatus>;

    /// Removes the document stored under `id` and returns it as it was just before removal.
    async fn take_document(
        &self,
        id: ObjectId,
        collection: &str,
    ) -> DocumentStoreResult<Option<BsonDocument>>;

    /// Lists the names of all collections.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Drops a collection and all its documents. Dropping a missing collection is not an error.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Ends the session and releases its resources.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Opens backend sessions for a [`Connection`](crate::connection::Connection).
#[async_trait]
pub trait BackendConnector: Send + Sync + Debug {
    type Backend: StoreBackend;

    /// Establishes a session with the store at `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`](crate::error::StoreError) if the store cannot be reached.
    async fn connect(
        &self,
        target: &ConnectionTarget,
        options: &ConnectionOptions,
    ) -> DocumentStoreResult<Self::Backend>;
}
