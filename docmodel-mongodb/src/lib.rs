//! MongoDB backend implementation for docmodel.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait on top of
//! the official driver, and a connector that turns a `host:port/database` target into a
//! session.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Native identifiers** - `_id` values are stored as BSON ObjectIds
//! - **Server-side queries** - Filters, sorting and paging run in MongoDB
//! - **Server-side cursors** - Streams pull batches lazily and are killed when dropped
//! - **Typed failures** - Driver errors surface as `StoreError` variants
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{DocumentStore, mongodb::MongoDbConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(MongoDbConnector::new());
//!     store.connect("localhost:27017/node-examples").await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod store;
mod error;
mod query;

pub use store::{MongoDbConnector, MongoDbStore};
