//! Core traits for document representation and serialization.
//!
//! A model type becomes storable by implementing [`Document`], usually through
//! `#[derive(Document)]`. The primary key must serialize under `_id`:
//!
//! ```ignore
//! use docmodel::{Document, id::ObjectId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     #[document(id)]
//!     pub id: Option<ObjectId>,
//!     pub firstname: String,
//!     pub address: Address,
//! }
//! ```

use bson::{Bson, Document as BsonDocument, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::{ObjectId, PRIMARY_KEY},
};

/// Core trait that all model types stored in a collection must implement.
///
/// # Example
///
/// ```ignore
/// impl Document for User {
///     fn id(&self) -> Option<&ObjectId> {
///         self.id.as_ref()
///     }
///
///     fn set_id(&mut self, id: ObjectId) {
///         self.id = Some(id);
///     }
///
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the primary key, or `None` if one has not been assigned yet.
    fn id(&self) -> Option<&ObjectId>;

    /// Assigns the primary key.
    fn set_id(&mut self, id: ObjectId);

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;

    /// Serialized paths holding identifiers. Filter terms on these paths are cast to
    /// [`ObjectId`] before a query runs.
    fn id_paths() -> &'static [&'static str] {
        &[PRIMARY_KEY]
    }
}

/// Conversion helpers, implemented for every [`Document`].
pub trait DocumentExt: Document {
    /// Serializes into a BSON document with `_id` set to the primary key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or does not produce a document.
    fn to_bson_document(&self) -> DocumentStoreResult<BsonDocument>;

    /// Deserializes from a stored BSON document.
    fn from_bson_document(document: BsonDocument) -> DocumentStoreResult<Self>;

    /// Assigns a fresh identifier unless one is present, and returns the primary key.
    fn ensure_id(&mut self) -> ObjectId;
}

impl<D: Document> DocumentExt for D {
    fn to_bson_document(&self) -> DocumentStoreResult<BsonDocument> {
        let mut document = match serialize_to_bson(self)? {
            Bson::Document(document) => document,
            other => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "{} serialized to {:?}, expected a document",
                    D::collection_name(),
                    other.element_type()
                )));
            }
        };

        if let Some(id) = self.id() {
            document.insert(PRIMARY_KEY, Bson::from(id));
        }

        Ok(document)
    }

    fn from_bson_document(document: BsonDocument) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    fn ensure_id(&mut self) -> ObjectId {
        match self.id() {
            Some(id) => *id,
            None => {
                let id = ObjectId::new();
                self.set_id(id);
                id
            }
        }
    }
}

/// Reads the primary key of a stored BSON document.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] if `_id` is missing or not an identifier.
pub fn primary_key(document: &BsonDocument) -> DocumentStoreResult<ObjectId> {
    match document.get(PRIMARY_KEY) {
        Some(Bson::ObjectId(oid)) => Ok(ObjectId::from(*oid)),
        Some(other) => Err(DocumentStoreError::InvalidDocument(format!(
            "primary key must be an ObjectId, found {other}"
        ))),
        None => Err(DocumentStoreError::InvalidDocument("document has no _id".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        text: String,
    }

    impl Document for Note {
        fn id(&self) -> Option<&ObjectId> {
            self.id.as_ref()
        }

        fn set_id(&mut self, id: ObjectId) {
            self.id = Some(id);
        }

        fn collection_name() -> &'static str {
            "notes"
        }
    }

    #[test]
    fn ensure_id_assigns_once() {
        let mut note = Note { id: None, text: "hi".into() };

        let first = note.ensure_id();
        let second = note.ensure_id();

        assert_eq!(first, second);
        assert_eq!(note.id, Some(first));
    }

    #[test]
    fn ensure_id_keeps_caller_choice() {
        let chosen = ObjectId::new();
        let mut note = Note { id: Some(chosen), text: "hi".into() };

        assert_eq!(note.ensure_id(), chosen);
    }

    #[test]
    fn bson_round_trip_keeps_primary_key() {
        let note = Note { id: Some(ObjectId::new()), text: "hello".into() };

        let stored = note.to_bson_document().unwrap();
        assert_eq!(primary_key(&stored).unwrap(), note.id.unwrap());
        assert_eq!(Note::from_bson_document(stored).unwrap(), note);
    }

    #[test]
    fn malformed_stored_document_is_a_serialization_error() {
        let err = Note::from_bson_document(doc! { "_id": ObjectId::new(), "text": 7 }).unwrap_err();

        assert!(matches!(err, DocumentStoreError::Serialization(_)));
    }

    #[test]
    fn unsaved_document_has_no_primary_key() {
        let note = Note { id: None, text: "draft".into() };

        let stored = note.to_bson_document().unwrap();
        assert!(stored.get(PRIMARY_KEY).is_none());
    }

    #[test]
    fn primary_key_rejects_string_ids() {
        let err = primary_key(&doc! { "_id": "abc" }).unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }
}
