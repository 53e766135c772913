use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use bson::{Bson, Document, doc};
use std::collections::HashSet;
use mongodb::{
    Client, Collection as MongoCollection, Database,
    options::{ClientOptions, CountOptions, FindOptions},
};
use docmodel_core::{
    backend::{BackendConnector, DeleteStatus, DocumentStream, StoreBackend, UpdateStatus, WriteScope},
    config::{ConnectionOptions, ConnectionTarget},
    document::primary_key,
    error::{DocumentStoreError, DocumentStoreResult, StoreError},
    id::ObjectId,
    query::Query,
};

use crate::{
    error::{duplicate_key_index, to_store_error},
    query::MongoQueryTranslator,
};


/// A session with one MongoDB database.
///
/// Cloning is cheap; clones share the driver's connection pool.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: Database,
}

impl MongoDbStore {
    pub fn new(client: Client, database: &str) -> Self {
        Self {
            database: client.database(database),
            client,
        }
    }

    /// Name of the database this session works on.
    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    /// Checks that the server answers.
    pub async fn ping(&self) -> DocumentStoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(format!("Ping failed: {e}")))?;

        Ok(())
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.database.collection(collection_name)
    }

    fn find_options(query: &Query) -> FindOptions {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        options.sort = MongoQueryTranslator::sort(query);

        options
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<u64> {
        if documents.is_empty() {
            return Ok(0);
        }

        let ids = documents
            .iter()
            .map(primary_key)
            .collect::<DocumentStoreResult<Vec<ObjectId>>>()?;

        let duplicate = |id: ObjectId| -> DocumentStoreError {
            StoreError::DuplicateKey(id.to_string(), collection.to_string()).into()
        };

        if let Some(id) = first_repeated(&ids) {
            return Err(duplicate(id));
        }

        let taken = self.get_collection(collection)
            .find_one(doc! { "_id": { "$in": ids.iter().map(|id| Bson::from(*id)).collect::<Vec<_>>() } })
            .projection(doc! { "_id": 1 })
            .await
            .map_err(to_store_error)?;

        if let Some(taken) = taken {
            return Err(duplicate(primary_key(&taken)?));
        }

        let result = self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| match duplicate_key_index(&e).and_then(|index| ids.get(index)) {
                Some(id) => duplicate(*id),
                None => to_store_error(e),
            })?;

        Ok(result.inserted_ids.len() as u64)
    }

    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(MongoQueryTranslator::filter(&query)?)
            .with_options(Self::find_options(&query))
            .await
            .map_err(to_store_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(to_store_error)
    }

    async fn stream_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<DocumentStream> {
        let cursor = self.get_collection(collection)
            .find(MongoQueryTranslator::filter(&query)?)
            .with_options(Self::find_options(&query))
            .await
            .map_err(to_store_error)?;

        Ok(cursor.map_err(to_store_error).boxed())
    }

    async fn update_documents(
        &self,
        query: Query,
        changes: Document,
        scope: WriteScope,
        collection: &str,
    ) -> DocumentStoreResult<UpdateStatus> {
        let filter = MongoQueryTranslator::filter(&query)?;
        let update = doc! { "$set": changes };
        let target = self.get_collection(collection);

        let result = match scope {
            WriteScope::One => target.update_one(filter, update).await,
            WriteScope::Many => target.update_many(filter, update).await,
        }
        .map_err(to_store_error)?;

        Ok(UpdateStatus {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn count_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<u64> {
        let mut options = CountOptions::default();
        options.limit = query.limit.map(|limit| limit as u64);
        options.skip = query.offset.map(|skip| skip as u64);

        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(&query)?)
            .with_options(options)
            .await
            .map_err(to_store_error)
    }

    async fn delete_documents(&self, query: Query, scope: WriteScope, collection: &str) -> DocumentStoreResult<DeleteStatus> {
        let filter = MongoQueryTranslator::filter(&query)?;
        let target = self.get_collection(collection);

        let result = match scope {
            WriteScope::One => target.delete_one(filter).await,
            WriteScope::Many => target.delete_many(filter).await,
        }
        .map_err(to_store_error)?;

        Ok(DeleteStatus { deleted_count: result.deleted_count })
    }

    async fn take_document(&self, id: ObjectId, collection: &str) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one_and_delete(doc! { "_id": id })
            .await
            .map_err(to_store_error)
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.database
            .list_collection_names()
            .await
            .map_err(to_store_error)?;
        names.sort();

        Ok(names)
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(to_store_error)
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}


/// Returns the first identifier that occurs more than once in `ids`.
fn first_repeated(ids: &[ObjectId]) -> Option<ObjectId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().find(|id| !seen.insert(**id)).copied()
}

/// Opens [`MongoDbStore`] sessions.
///
/// The server address and database come from the [`ConnectionTarget`]; timeouts, pool size
/// and application name from the [`ConnectionOptions`]. The server is pinged before a
/// session is handed out, so an unreachable server fails `connect` instead of the first
/// operation.
#[derive(Debug, Clone, Default)]
pub struct MongoDbConnector {
    _private: (),
}

impl MongoDbConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the driver options for `target`.
    pub async fn client_options(target: &ConnectionTarget, options: &ConnectionOptions) -> DocumentStoreResult<ClientOptions> {
        let mut client_options = ClientOptions::parse(target.server_uri())
            .await
            .map_err(|e| DocumentStoreError::Configuration(e.to_string()))?;

        if let Some(app) = &options.app_name {
            client_options.app_name = Some(app.clone());
        }
        if let Some(connect) = options.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = options.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if let Some(max) = options.max_pool_size {
            client_options.max_pool_size = Some(max);
        }

        Ok(client_options)
    }
}

#[async_trait]
impl BackendConnector for MongoDbConnector {
    type Backend = MongoDbStore;

    async fn connect(&self, target: &ConnectionTarget, options: &ConnectionOptions) -> DocumentStoreResult<MongoDbStore> {
        let client = Client::with_options(Self::client_options(target, options).await?)
            .map_err(|e| DocumentStoreError::Configuration(e.to_string()))?;

        let store = MongoDbStore::new(client, &target.database);
        store.ping().await?;

        tracing::debug!("MongoDB at {} answered ping", target.server_uri());

        Ok(store)
    }
}
