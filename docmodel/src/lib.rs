//! Main docmodel crate providing a unified interface for document storage.
//!
//! This crate is the primary entry point for users of the docmodel framework. It re-exports
//! the core types from the sub-crates, the `Document` derive, and the available backends.
//!
//! # Features
//!
//! - **Identifiers** - 12-byte `ObjectId`s generated on the client, with a 24-character hex form
//! - **Casting** - filter values on identifier paths are converted before a query runs, and
//!   malformed input fails with a `CastError`
//! - **Typed collections** - define models with Serde and `#[derive(Document)]`
//! - **Cursors** - lazy result streams with data, error and close events
//! - **Explicit connections** - `connect("host:port/db")` and `disconnect()` on a handle
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryConnector};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     pub firstname: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryConnector::new());
//!     store.connect("localhost:27017/node-examples").await?;
//!
//!     let users = store.typed_collection::<User>();
//!     let saved = users
//!         .insert(User { id: None, firstname: "Ada".to_string() })
//!         .await?
//!         .document;
//!
//!     // Hex strings are cast to identifiers.
//!     let id = saved.id.map(|id| id.to_hex()).unwrap_or_default();
//!     let found = users.find_one(doc! { "_id": id }).await?;
//!     println!("found: {found:?}");
//!
//!     // A malformed identifier is a cast error, not an empty result.
//!     let err = users.find_one(doc! { "_id": "nope" }).await.unwrap_err();
//!     assert!(err.is_cast());
//!
//!     let mut cursor = users.find_stream(Query::all()).await?;
//!     while let Some(user) = cursor.try_next().await? {
//!         println!("{user:?}");
//!     }
//!
//!     store.disconnect().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process store for development and testing
//! - `mongodb` - MongoDB through the official driver (requires the `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{
    backend, cast, collection, config, connection, cursor, document, error, id, query, store,
};
pub use docmodel_core::store::DocumentStore;
pub use docmodel_macros::Document;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryConnector, InMemoryStore};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbConnector, MongoDbStore};
}
