//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use docmodel::{
    Document, DocumentStore,
    config::ConnectionTarget,
    id::ObjectId,
    memory::{InMemoryConnector, InMemoryStore},
};
use serde::{Deserialize, Serialize};

pub const ADDRESS: &str = "localhost:27017/node-examples";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "users")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[document(id)]
    pub id: Option<ObjectId>,
    pub firstname: String,
    pub lastname: String,
    pub address: Address,
}

impl User {
    pub fn sample() -> Self {
        Self {
            id: None,
            firstname: "Firstname".to_string(),
            lastname: "Lastname".to_string(),
            address: Address {
                street: "3 rue de l'Eglise".to_string(),
                city: "Paris".to_string(),
            },
        }
    }
}

/// A store connected to a fresh in-memory server.
pub async fn connected_store() -> DocumentStore<InMemoryConnector> {
    let store = DocumentStore::new(InMemoryConnector::new());
    store.connect(ADDRESS).await.unwrap();
    store
}

/// The server-side database behind [`ADDRESS`].
pub async fn database(store: &DocumentStore<InMemoryConnector>) -> InMemoryStore {
    let target = ConnectionTarget::parse(ADDRESS).unwrap();
    store.connection().connector().database(&target).await.unwrap()
}
