//! Collection types for document store operations.
//!
//! A collection borrows a [`Connection`] and resolves the live session on every call, so
//! the same collection value keeps working across `disconnect`/`connect` cycles and fails
//! with [`StoreError::NotConnected`](crate::error::StoreError::NotConnected) in between.
//!
//! # Collection Types
//!
//! - [`Collection`] - Untyped collection with explicit BSON documents
//! - [`TypedCollection`] - Type-safe collection for a specific document type
//!
//! # Failure order
//!
//! Filters are cast before the session is looked up: a malformed identifier is always
//! reported as a [`CastError`](crate::error::CastError), connected or not.
//!
//! # Example
//!
//! ```ignore
//! let users = store.typed_collection::<User>();
//!
//! let saved = users.insert(user).await?.document;
//! let found = users.find_one(doc! { "_id": saved.id.unwrap().to_hex() }).await?;
//! let status = users.update(doc! { "firstname": "Ada" }, doc! { "address.city": "London" }).await?;
//! ```

use bson::{Bson, Document as BsonDocument};
use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    backend::{BackendConnector, DeleteStatus, DocumentStream, StoreBackend, UpdateStatus, WriteScope},
    cast::cast_object_id,
    connection::Connection,
    cursor::Cursor,
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{ObjectId, PRIMARY_KEY},
    query::Query,
};

const PRIMARY_KEY_PATHS: &[&str] = &[PRIMARY_KEY];

/// Result of inserting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome<T> {
    /// The document as stored, including its primary key.
    pub document: T,
    pub inserted_count: u64,
}

/// Result of inserting several documents.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyOutcome<T> {
    /// The documents as stored, in input order.
    pub documents: Vec<T>,
    pub inserted_count: u64,
}

/// An untyped collection working on raw BSON documents.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the connection reference
/// * `C` - The connector that opens backend sessions
pub struct Collection<'a, C: BackendConnector> {
    name: String,
    id_paths: &'static [&'static str],
    connection: &'a Connection<C>,
}

impl<'a, C: BackendConnector> Collection<'a, C> {
    pub(crate) fn new(name: String, connection: &'a Connection<C>) -> Self {
        Self::with_id_paths(name, PRIMARY_KEY_PATHS, connection)
    }

    pub(crate) fn with_id_paths(
        name: String,
        id_paths: &'static [&'static str],
        connection: &'a Connection<C>,
    ) -> Self {
        Self { name, id_paths, connection }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a document.
    ///
    /// A missing `_id` is generated; a supplied one is kept (a hex string or raw bytes are
    /// converted to an identifier first).
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`](crate::error::CastError) for a malformed `_id`, or
    /// [`StoreError::DuplicateKey`](crate::error::StoreError::DuplicateKey) if the
    /// identifier is taken.
    pub async fn insert(&self, document: BsonDocument) -> DocumentStoreResult<InsertOutcome<BsonDocument>> {
        let document = prepare_insert(document)?;
        let inserted_count = self
            .backend()
            .await?
            .insert_documents(vec![document.clone()], &self.name)
            .await?;

        tracing::debug!("Inserted {} into {}", primary_key_text(&document), self.name);

        Ok(InsertOutcome { document, inserted_count })
    }

    /// Inserts several documents at once. Nothing is written if one of the `_id`s is taken.
    pub async fn insert_many(
        &self,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<InsertManyOutcome<BsonDocument>> {
        let documents = documents
            .into_iter()
            .map(prepare_insert)
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let backend = self.backend().await?;
        if documents.is_empty() {
            return Ok(InsertManyOutcome { documents, inserted_count: 0 });
        }

        let inserted_count = backend
            .insert_documents(documents.clone(), &self.name)
            .await?;

        tracing::debug!("Inserted {} documents into {}", inserted_count, self.name);

        Ok(InsertManyOutcome { documents, inserted_count })
    }

    /// Returns the first document matching `filter`, or `None`.
    pub async fn find_one(&self, filter: impl Into<Query>) -> DocumentStoreResult<Option<BsonDocument>> {
        let query = self.prepare(filter)?.first();
        let found = self
            .backend()
            .await?
            .find_documents(query, &self.name)
            .await?
            .into_iter()
            .next();

        tracing::debug!("find_one on {} matched: {}", self.name, found.is_some());

        Ok(found)
    }

    /// Returns every document matching `filter`; empty when nothing matches.
    pub async fn find(&self, filter: impl Into<Query>) -> DocumentStoreResult<Vec<BsonDocument>> {
        let query = self.prepare(filter)?;
        let found = self
            .backend()
            .await?
            .find_documents(query, &self.name)
            .await?;

        tracing::debug!("find on {} returned {} documents", self.name, found.len());

        Ok(found)
    }

    /// Opens a lazy cursor over the documents matching `filter`.
    pub async fn find_stream(&self, filter: impl Into<Query>) -> DocumentStoreResult<Cursor<BsonDocument>> {
        let stream = self.open_stream(filter).await?;

        Ok(Cursor::new(stream, Ok, self.name.clone()))
    }

    /// Applies `patch` to the first document matching `filter`.
    ///
    /// The patch names the fields to set, optionally as dotted paths into nested documents
    /// (`"address.city"`); every other field is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the patch is empty, names `_id`,
    /// or uses an operator key.
    pub async fn update(&self, filter: impl Into<Query>, patch: BsonDocument) -> DocumentStoreResult<UpdateStatus> {
        self.apply_update(filter.into(), patch, WriteScope::One).await
    }

    /// Applies `patch` to every document matching `filter`.
    pub async fn update_many(
        &self,
        filter: impl Into<Query>,
        patch: BsonDocument,
    ) -> DocumentStoreResult<UpdateStatus> {
        self.apply_update(filter.into(), patch, WriteScope::Many).await
    }

    /// Counts the documents matching `filter`.
    pub async fn count(&self, filter: impl Into<Query>) -> DocumentStoreResult<u64> {
        let query = self.prepare(filter)?;
        let count = self
            .backend()
            .await?
            .count_documents(query, &self.name)
            .await?;

        tracing::debug!("{} documents in {} match", count, self.name);

        Ok(count)
    }

    /// Removes every document matching `filter`.
    pub async fn remove(&self, filter: impl Into<Query>) -> DocumentStoreResult<DeleteStatus> {
        self.apply_delete(filter.into(), WriteScope::Many).await
    }

    /// Removes at most one document matching `filter`.
    pub async fn remove_one(&self, filter: impl Into<Query>) -> DocumentStoreResult<DeleteStatus> {
        self.apply_delete(filter.into(), WriteScope::One).await
    }

    /// Removes the stored document with the same `_id` as `document`.
    ///
    /// # Returns
    ///
    /// The document as it was stored just before removal, or `None` if `document` has no
    /// `_id` or nothing is stored under it.
    pub async fn remove_document(&self, document: &BsonDocument) -> DocumentStoreResult<Option<BsonDocument>> {
        let id = document
            .get(PRIMARY_KEY)
            .map(|value| cast_object_id(value, PRIMARY_KEY))
            .transpose()?;

        match id {
            Some(id) => self.take(id).await,
            None => {
                self.backend().await?;
                Ok(None)
            }
        }
    }

    pub(crate) async fn take(&self, id: ObjectId) -> DocumentStoreResult<Option<BsonDocument>> {
        let removed = self
            .backend()
            .await?
            .take_document(id, &self.name)
            .await?;

        tracing::debug!("Removed {} from {}: {}", id, self.name, removed.is_some());

        Ok(removed)
    }

    pub(crate) async fn open_stream(&self, filter: impl Into<Query>) -> DocumentStoreResult<DocumentStream> {
        let query = self.prepare(filter)?;
        let stream = self
            .backend()
            .await?
            .stream_documents(query, &self.name)
            .await?;

        tracing::debug!("Opened cursor on {}", self.name);

        Ok(stream)
    }

    async fn apply_update(&self, query: Query, patch: BsonDocument, scope: WriteScope) -> DocumentStoreResult<UpdateStatus> {
        let query = self.prepare(query)?;
        validate_patch(&patch)?;

        let status = self
            .backend()
            .await?
            .update_documents(query, patch, scope, &self.name)
            .await?;

        tracing::debug!(
            "Updated {:?} in {}: matched {}, modified {}",
            scope,
            self.name,
            status.matched_count,
            status.modified_count
        );

        Ok(status)
    }

    async fn apply_delete(&self, query: Query, scope: WriteScope) -> DocumentStoreResult<DeleteStatus> {
        let query = self.prepare(query)?;
        let status = self
            .backend()
            .await?
            .delete_documents(query, scope, &self.name)
            .await?;

        tracing::debug!("Removed {:?} from {}: {}", scope, self.name, status.deleted_count);

        Ok(status)
    }

    fn prepare(&self, filter: impl Into<Query>) -> DocumentStoreResult<Query> {
        Ok(filter.into().cast(self.id_paths)?)
    }

    async fn backend(&self) -> DocumentStoreResult<Arc<C::Backend>> {
        self.connection.backend().await
    }
}

impl<C: BackendConnector> fmt::Debug for Collection<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("id_paths", &self.id_paths)
            .finish_non_exhaustive()
    }
}

/// A collection of one [`Document`] type.
///
/// Filters are cast on every path listed by [`Document::id_paths`], not just `_id`.
pub struct TypedCollection<'a, C: BackendConnector, D: Document> {
    inner: Collection<'a, C>,
    _marker: PhantomData<fn() -> D>,
}

impl<'a, C: BackendConnector, D: Document> TypedCollection<'a, C, D> {
    pub(crate) fn new(name: String, connection: &'a Connection<C>) -> Self {
        Self {
            inner: Collection::with_id_paths(name, D::id_paths(), connection),
            _marker: PhantomData,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns an untyped view of the same collection.
    pub fn untyped(&self) -> &Collection<'a, C> {
        &self.inner
    }

    /// Converts this typed collection to a different document type.
    ///
    /// This method allows switching between different document types for the same collection.
    pub fn with_type<T: Document>(&self) -> TypedCollection<'a, C, T> {
        TypedCollection {
            inner: Collection::with_id_paths(self.inner.name.clone(), T::id_paths(), self.inner.connection),
            _marker: PhantomData,
        }
    }

    /// Inserts a document, assigning a fresh identifier if it has none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`](crate::error::StoreError::DuplicateKey) if the
    /// identifier is taken, or a serialization error.
    pub async fn insert(&self, mut document: D) -> DocumentStoreResult<InsertOutcome<D>> {
        document.ensure_id();
        let outcome = self.inner.insert(document.to_bson_document()?).await?;

        Ok(InsertOutcome { document, inserted_count: outcome.inserted_count })
    }

    /// Inserts several documents, assigning identifiers where missing.
    pub async fn insert_many(&self, documents: Vec<D>) -> DocumentStoreResult<InsertManyOutcome<D>> {
        let documents = documents
            .into_iter()
            .map(|mut document| {
                document.ensure_id();
                document
            })
            .collect::<Vec<D>>();

        let stored = documents
            .iter()
            .map(|document| document.to_bson_document())
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let outcome = self.inner.insert_many(stored).await?;

        Ok(InsertManyOutcome { documents, inserted_count: outcome.inserted_count })
    }

    pub async fn find_one(&self, filter: impl Into<Query>) -> DocumentStoreResult<Option<D>> {
        self.inner
            .find_one(filter)
            .await?
            .map(D::from_bson_document)
            .transpose()
    }

    pub async fn find(&self, filter: impl Into<Query>) -> DocumentStoreResult<Vec<D>> {
        self.inner
            .find(filter)
            .await?
            .into_iter()
            .map(D::from_bson_document)
            .collect()
    }

    /// Opens a lazy cursor; documents are decoded as they are pulled.
    pub async fn find_stream(&self, filter: impl Into<Query>) -> DocumentStoreResult<Cursor<D>> {
        let stream = self.inner.open_stream(filter).await?;

        Ok(Cursor::new(stream, D::from_bson_document, self.inner.name.clone()))
    }

    /// See [`Collection::update`].
    pub async fn update(&self, filter: impl Into<Query>, patch: BsonDocument) -> DocumentStoreResult<UpdateStatus> {
        self.inner.update(filter, patch).await
    }

    pub async fn update_many(
        &self,
        filter: impl Into<Query>,
        patch: BsonDocument,
    ) -> DocumentStoreResult<UpdateStatus> {
        self.inner.update_many(filter, patch).await
    }

    pub async fn count(&self, filter: impl Into<Query>) -> DocumentStoreResult<u64> {
        self.inner.count(filter).await
    }

    pub async fn remove(&self, filter: impl Into<Query>) -> DocumentStoreResult<DeleteStatus> {
        self.inner.remove(filter).await
    }

    pub async fn remove_one(&self, filter: impl Into<Query>) -> DocumentStoreResult<DeleteStatus> {
        self.inner.remove_one(filter).await
    }

    /// Removes the stored counterpart of `document`, identified by its primary key.
    ///
    /// # Returns
    ///
    /// The stored snapshot taken just before removal. It may differ from `document` if the
    /// stored copy was updated in the meantime. `None` if `document` has no identifier or
    /// nothing is stored under it.
    pub async fn remove_document(&self, document: &D) -> DocumentStoreResult<Option<D>> {
        let Some(id) = document.id() else {
            self.inner.backend().await?;
            return Ok(None);
        };

        self.inner
            .take(*id)
            .await?
            .map(D::from_bson_document)
            .transpose()
    }
}

impl<C: BackendConnector, D: Document> fmt::Debug for TypedCollection<'_, C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCollection")
            .field("name", &self.inner.name)
            .field("document", &std::any::type_name::<D>())
            .finish()
    }
}

/// Normalizes `_id` to an identifier, generating one when absent.
fn prepare_insert(mut document: BsonDocument) -> DocumentStoreResult<BsonDocument> {
    let id = match document.get(PRIMARY_KEY) {
        Some(value) => cast_object_id(value, PRIMARY_KEY)?,
        None => ObjectId::new(),
    };

    document.insert(PRIMARY_KEY, Bson::from(id));
    Ok(document)
}

fn validate_patch(patch: &BsonDocument) -> DocumentStoreResult<()> {
    if patch.is_empty() {
        return Err(DocumentStoreError::InvalidDocument("update patch is empty".to_string()));
    }

    for key in patch.keys() {
        if key == PRIMARY_KEY || key.starts_with("_id.") {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "update patch may not change the primary key (\"{key}\")"
            )));
        }
        if key.is_empty() || key.starts_with('$') || key.split('.').any(str::is_empty) {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "invalid field path \"{key}\" in update patch"
            )));
        }
    }

    Ok(())
}

fn primary_key_text(document: &BsonDocument) -> String {
    match document.get(PRIMARY_KEY) {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
        None => "<no id>".to_string(),
    }
}
