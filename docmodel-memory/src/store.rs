//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON documents in ordered maps keyed by their identifier, behind
//! an async-safe read-write lock. Writes take the write lock, so writers to the same
//! document are serialized.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use async_trait::async_trait;
use bson::Document as BsonDocument;
use futures::{StreamExt, stream};
use mea::rwlock::RwLock;

use docmodel_core::{
    backend::{DeleteStatus, DocumentStream, StoreBackend, UpdateStatus, WriteScope},
    document::primary_key,
    error::{DocumentStoreResult, StoreError},
    id::ObjectId,
    query::Query,
};

use crate::{evaluator::{DocumentEvaluator, compare_by}, patch};

type CollectionMap = BTreeMap<ObjectId, BsonDocument>;
type StoreMap = HashMap<String, CollectionMap>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses `Arc`-wrapped internal state; clones share the
/// same data. Queries scan the whole collection. Unsorted results come back in
/// identifier order.
///
/// The store can be switched offline with [`InMemoryStore::set_offline`] to simulate an
/// unreachable server: every operation, including reads from open cursors, then fails
/// with [`StoreError::Connection`].
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::{StoreBackend, WriteScope};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert_documents(vec![doc! { "_id": ObjectId::new(), "name": "Alice" }], "users").await?;
///
/// let found = store.find_documents(Filter::eq("name", "Alice").into(), "users").await?;
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
    offline: Arc<AtomicBool>,
    open_cursors: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (or regaining) the server.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        tracing::debug!("In-memory store is now {}", if offline { "offline" } else { "online" });
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of cursors that have not been exhausted, closed or dropped yet.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> DocumentStoreResult<()> {
        if self.is_offline() {
            return Err(StoreError::Connection("in-memory store is offline".to_string()).into());
        }

        Ok(())
    }

    /// Identifiers of the documents matching `query`, in result order.
    fn select(collection: &CollectionMap, query: &Query) -> DocumentStoreResult<Vec<ObjectId>> {
        let mut matched = Vec::new();

        for (id, document) in collection {
            if DocumentEvaluator::matches(document, query.filter.as_ref())? {
                matched.push((id, document));
            }
        }

        if let Some(sort) = &query.sort {
            matched.sort_by(|(_, a), (_, b)| compare_by(sort, a, b));
        }

        Ok(
            matched
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .map(|(id, _)| *id)
                .collect()
        )
    }

    fn scoped(mut ids: Vec<ObjectId>, scope: WriteScope) -> Vec<ObjectId> {
        if scope == WriteScope::One {
            ids.truncate(1);
        }

        ids
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<BsonDocument>, collection: &str) -> DocumentStoreResult<u64> {
        self.ensure_online()?;

        let mut keyed = Vec::with_capacity(documents.len());
        for document in documents {
            keyed.push((primary_key(&document)?, document));
        }

        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        for (index, (id, _)) in keyed.iter().enumerate() {
            let repeated = keyed[..index].iter().any(|(earlier, _)| earlier == id);

            if repeated || collection_map.contains_key(id) {
                return Err(StoreError::DuplicateKey(id.to_string(), collection.to_string()).into());
            }
        }

        let inserted = keyed.len() as u64;
        collection_map.extend(keyed);

        Ok(inserted)
    }

    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
        self.ensure_online()?;

        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        Ok(
            Self::select(collection_map, &query)?
                .iter()
                .filter_map(|id| collection_map.get(id).cloned())
                .collect()
        )
    }

    async fn stream_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<DocumentStream> {
        self.ensure_online()?;

        let pending = match self.store.read().await.get(collection) {
            Some(collection_map) => Self::select(collection_map, &query)?,
            None => vec![],
        };

        let state = StreamState {
            store: self.clone(),
            collection: collection.to_string(),
            pending: pending.into_iter(),
            failed: false,
            _cursor: CursorGuard::open(Arc::clone(&self.open_cursors)),
        };

        Ok(stream::unfold(state, StreamState::next).boxed())
    }

    async fn update_documents(
        &self,
        query: Query,
        changes: BsonDocument,
        scope: WriteScope,
        collection: &str,
    ) -> DocumentStoreResult<UpdateStatus> {
        self.ensure_online()?;

        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(UpdateStatus::default());
        };

        let mut status = UpdateStatus::default();
        let mut updated = Vec::new();

        // Patch copies first so a failing match leaves every document as it was.
        for id in Self::scoped(Self::select(collection_map, &query)?, scope) {
            if let Some(document) = collection_map.get(&id) {
                status.matched_count += 1;

                let mut document = document.clone();
                if patch::apply(&mut document, &changes)? {
                    updated.push((id, document));
                }
            }
        }

        status.modified_count = updated.len() as u64;
        collection_map.extend(updated);

        Ok(status)
    }

    async fn count_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<u64> {
        self.ensure_online()?;

        Ok(
            match self.store.read().await.get(collection) {
                Some(collection_map) => Self::select(collection_map, &query)?.len() as u64,
                None => 0,
            }
        )
    }

    async fn delete_documents(&self, query: Query, scope: WriteScope, collection: &str) -> DocumentStoreResult<DeleteStatus> {
        self.ensure_online()?;

        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(DeleteStatus::default());
        };

        let deleted_count = Self::scoped(Self::select(collection_map, &query)?, scope)
            .into_iter()
            .filter(|id| collection_map.remove(id).is_some())
            .count() as u64;

        Ok(DeleteStatus { deleted_count })
    }

    async fn take_document(&self, id: ObjectId, collection: &str) -> DocumentStoreResult<Option<BsonDocument>> {
        self.ensure_online()?;

        Ok(
            self.store
                .write()
                .await
                .get_mut(collection)
                .and_then(|collection_map| collection_map.remove(&id))
        )
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.ensure_online()?;

        let mut names = self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.ensure_online()?;
        self.store.write().await.remove(name);

        Ok(())
    }
}


/// Keeps the open-cursor count up to date for as long as a stream is alive.
#[derive(Debug)]
struct CursorGuard(Arc<AtomicUsize>);

impl CursorGuard {
    fn open(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A snapshot of matching identifiers; documents are read one at a time as the stream is
/// polled, so removals made in the meantime are skipped.
struct StreamState {
    store: InMemoryStore,
    collection: String,
    pending: std::vec::IntoIter<ObjectId>,
    failed: bool,
    _cursor: CursorGuard,
}

impl StreamState {
    async fn next(mut self) -> Option<(DocumentStoreResult<BsonDocument>, Self)> {
        if self.failed {
            return None;
        }

        loop {
            let id = self.pending.next()?;

            if let Err(err) = self.store.ensure_online() {
                self.failed = true;
                return Some((Err(err), self));
            }

            let document = self.store
                .store
                .read()
                .await
                .get(&self.collection)
                .and_then(|collection_map| collection_map.get(&id))
                .cloned();

            if let Some(document) = document {
                return Some((Ok(document), self));
            }
        }
    }
}
