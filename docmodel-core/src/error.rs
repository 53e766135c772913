//! Error types and result types for document store operations.
//!
//! Failures fall into two families that callers must be able to tell apart:
//!
//! - [`CastError`] - malformed identifier input, detected locally before any backend call
//! - [`StoreError`] - transport, server or connection-state failures
//!
//! "No matching document" is never an error; it is an empty or absent result.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use thiserror::Error;

/// A value could not be converted into the type required at a document path.
///
/// The [`Display`](std::fmt::Display) form is the message callers match on:
/// `Cast to ObjectId failed for value "<value>" at path "<path>"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cast to {kind} failed for value \"{value}\" at path \"{path}\"")]
pub struct CastError {
    /// The target type of the failed cast (e.g. `"ObjectId"`).
    pub kind: String,
    /// The offending input, rendered as text.
    pub value: String,
    /// The document path the value was destined for (e.g. `"_id"`).
    pub path: String,
}

impl CastError {
    pub const NAME: &'static str = "CastError";

    /// Creates a cast error for an identifier value.
    pub fn object_id(value: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: "ObjectId".to_string(),
            value: value.into(),
            path: path.into(),
        }
    }

    /// Returns the error name, always `"CastError"`.
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Returns the human readable message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Failures originating from, or on the way to, the remote document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An operation was issued on a handle that is not connected.
    #[error("Not connected to a document store")]
    NotConnected,
    /// `connect` was called with a different target while a session is open.
    /// The first argument is the current target, the second the requested one.
    #[error("Already connected to {0}, refusing to connect to {1}")]
    AlreadyConnected(String, String),
    /// The store could not be reached or the session broke.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The store did not answer in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
    /// A document with the given identifier already exists.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DuplicateKey(String, String),
    /// Any other server-side failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns the human readable message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// Malformed input for a typed path, detected before reaching the store.
    #[error(transparent)]
    Cast(#[from] CastError),
    /// Failure reported by, or while reaching, the store.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A model could not be converted to or from BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The document or update has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A connection target or option could not be understood.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DocumentStoreError {
    /// Returns the cast error, if this is one.
    pub fn as_cast(&self) -> Option<&CastError> {
        match self {
            DocumentStoreError::Cast(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the store error, if this is one.
    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            DocumentStoreError::Store(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_cast(&self) -> bool {
        self.as_cast().is_some()
    }

    pub fn is_store(&self) -> bool {
        self.as_store().is_some()
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
