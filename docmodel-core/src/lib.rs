//! A small object-document mapping layer over a document database.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Identifiers** ([`id`]) - 12-byte `ObjectId`s generated on the client
//! - **Cast layer** ([`cast`]) - conversion of loosely typed filter input into identifiers
//! - **Document traits** ([`document`]) - Core traits for defining and serializing documents
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Query construction and filtering
//! - **Connection lifecycle** ([`connection`], [`config`]) - explicit connect / disconnect
//! - **Collections interface** ([`collection`]) - High-level API for one collection
//! - **Cursors** ([`cursor`]) - lazy streams of query results
//! - **Document store** ([`store`]) - Main entry point tying the above together
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{Document, DocumentStore, id::ObjectId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     #[document(id)]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod cast;
pub mod collection;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod document;
pub mod error;
pub mod id;
pub mod query;
pub mod store;
