//! In-memory document storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait
//! and a connector that plays the part of a local server. It is meant for development and
//! tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and serialized writes using an async RwLock
//! - **Full query support** - Filtering on dotted paths, sorting and pagination
//! - **Partial updates** - `$set`-style patches, including nested fields
//! - **Failure simulation** - Unreachable servers and stores that go offline mid-stream
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{DocumentStore, memory::InMemoryConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryConnector::new());
//!     store.connect("localhost:27017/app").await?;
//!
//!     let users = store.typed_collection::<User>();
//!     let saved = users.insert(user).await?.document;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod connector;
pub mod store;
mod evaluator;
mod patch;

pub use connector::InMemoryConnector;
pub use store::InMemoryStore;
