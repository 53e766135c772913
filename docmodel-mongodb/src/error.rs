//! Mapping of driver errors onto [`StoreError`].

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use std::io::ErrorKind as IoErrorKind;

use docmodel_core::error::{DocumentStoreError, StoreError};

/// Server error code for a unique index violation.
pub(crate) const DUPLICATE_KEY_CODE: i32 = 11000;

/// Classifies a driver error:
///
/// - no selectable server, or an I/O timeout -> [`StoreError::Timeout`]
/// - broken or refused connections -> [`StoreError::Connection`]
/// - anything else -> [`StoreError::Backend`]
pub(crate) fn to_store_error(err: MongoError) -> DocumentStoreError {
    let message = err.to_string();

    let mapped = match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => StoreError::Timeout(message),
        ErrorKind::Io(io) if io.kind() == IoErrorKind::TimedOut => StoreError::Timeout(message),
        ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } | ErrorKind::DnsResolve { .. } => {
            StoreError::Connection(message)
        }
        _ => StoreError::Backend(message),
    };

    mapped.into()
}

/// Returns the batch position of the first document rejected for a duplicate key.
pub(crate) fn duplicate_key_index(err: &MongoError) -> Option<usize> {
    match err.kind.as_ref() {
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .as_ref()?
            .iter()
            .find(|write_error| write_error.code == DUPLICATE_KEY_CODE)
            .map(|write_error| write_error.index),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE => Some(0),
        _ => None,
    }
}
