//! Document identifiers.
//!
//! [`ObjectId`] is the 12-byte primary key of every stored document. Values are generated
//! on the client without a round-trip to the store, and their canonical textual form is
//! 24 lowercase hexadecimal characters. The textual and binary forms are bijective.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::id::ObjectId;
//!
//! let id = ObjectId::new();
//! let text = id.to_string();
//!
//! assert_eq!(ObjectId::parse(&text, "_id")?, id);
//! assert!(ObjectId::parse("badObjectId", "_id").is_err());
//! ```

use bson::{Bson, oid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::CastError;

/// Field name of the primary key in every stored document.
pub const PRIMARY_KEY: &str = "_id";

/// A 12-byte document identifier.
///
/// Serializes as a native BSON ObjectId, so a struct field of this type round-trips
/// through both the in-memory and MongoDB backends unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(oid::ObjectId);

impl ObjectId {
    /// Length of the canonical hex form.
    pub const HEX_LEN: usize = 24;

    /// Generates a fresh identifier, unique with high probability.
    pub fn new() -> Self {
        Self(oid::ObjectId::new())
    }

    /// Parses the canonical hex form.
    ///
    /// `path` names the field the value was meant for and is carried in the error.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] unless `text` is exactly 24 ASCII hex digits.
    pub fn parse(text: &str, path: &str) -> Result<Self, CastError> {
        if !Self::is_valid_hex(text) {
            return Err(CastError::object_id(text, path));
        }

        oid::ObjectId::parse_str(text)
            .map(Self)
            .map_err(|_| CastError::object_id(text, path))
    }

    /// Checks whether `text` has the canonical shape (24 hex characters, either case).
    pub fn is_valid_hex(text: &str) -> bool {
        text.len() == Self::HEX_LEN && text.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Builds an identifier from its raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(oid::ObjectId::from_bytes(bytes))
    }

    /// Returns the raw bytes.
    pub fn bytes(&self) -> [u8; 12] {
        self.0.bytes()
    }

    /// Returns the canonical lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Returns the generation time embedded in the identifier (second precision).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0.timestamp().to_chrono()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = CastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, PRIMARY_KEY)
    }
}

impl From<oid::ObjectId> for ObjectId {
    fn from(value: oid::ObjectId) -> Self {
        Self(value)
    }
}

impl From<ObjectId> for oid::ObjectId {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

impl From<ObjectId> for Bson {
    fn from(value: ObjectId) -> Self {
        Bson::ObjectId(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let id = ObjectId::new();
        let text = id.to_string();

        assert_eq!(text.len(), 24);
        assert_eq!(text, text.to_lowercase());
        assert_eq!(ObjectId::parse(&text, "_id").unwrap(), id);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = ObjectId::new();
        let b = ObjectId::new();

        assert_ne!(a, b);
    }

    #[test]
    fn uppercase_hex_is_accepted_and_normalized() {
        let id = ObjectId::parse("507F1F77BCF86CD799439011", "_id").unwrap();

        assert_eq!(id.to_string(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn malformed_strings_are_rejected() {
        for bad in ["", "badObjectId", "507f1f77bcf86cd79943901", "507f1f77bcf86cd7994390111", "507f1f77bcf86cd79943901z", "abcdefghijkl"] {
            let err = ObjectId::parse(bad, "_id").unwrap_err();

            assert_eq!(err.kind, "ObjectId");
            assert_eq!(err.value, bad);
            assert_eq!(err.path, "_id");
        }
    }

    #[test]
    fn multibyte_input_of_matching_length_is_rejected() {
        // 24 bytes, but not 24 hex characters
        let text = "ééééééééééåå";
        assert_eq!(text.len(), 24);
        assert!(ObjectId::parse(text, "_id").is_err());
    }

    #[test]
    fn bytes_round_trip() {
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let id = ObjectId::from_bytes(bytes);

        assert_eq!(id.bytes(), bytes);
        assert_eq!(id.to_hex(), "0102030405060708090a0b0c");
    }

    #[test]
    fn from_str_uses_primary_key_path() {
        let err = "nope".parse::<ObjectId>().unwrap_err();

        assert_eq!(err.path, PRIMARY_KEY);
    }

    #[test]
    fn timestamp_is_recent() {
        let id = ObjectId::new();
        let age = Utc::now() - id.timestamp();

        assert!(age.num_seconds() < 60);
    }

    #[test]
    fn converts_to_native_bson() {
        let id = ObjectId::new();

        assert_eq!(Bson::from(id), Bson::ObjectId(id.into()));
        assert_eq!(Bson::from(&id), Bson::from(id));
    }
}
