//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    backend::{BackendConnector, DeleteStatus, StoreBackend, UpdateStatus, WriteScope},
    cast::cast_object_id,
    collection::{Collection, InsertManyOutcome, InsertOutcome, TypedCollection},
    config::{ConnectionOptions, ConnectionTarget},
    connection::{Connection, ConnectionStatus},
    cursor::{Cursor, CursorEvent},
    document::{Document, DocumentExt},
    error::{CastError, DocumentStoreError, DocumentStoreResult, StoreError},
    id::ObjectId,
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    store::DocumentStore,
};
pub use docmodel_macros::Document;

pub use bson::doc;
pub use futures::{StreamExt, TryStreamExt};
