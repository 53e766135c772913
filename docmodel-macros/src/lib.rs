//! Procedural macros for the docmodel project.
//!
//! ## `Document`
//!
//! Derives `docmodel::document::Document` for a struct with named fields.
//!
//! - `#[document(collection = "users")]` on the struct names the collection. Without it the
//!   collection is the lowercased struct name followed by `s` (`User` -> `users`).
//! - `#[document(id)]` marks the primary key field. Without it, the field serialized as
//!   `_id` or the field named `id` is used. The field must be an `ObjectId` or an
//!   `Option<ObjectId>` and must serialize as `_id`.
//! - Every other field typed `ObjectId` or `Option<ObjectId>` is registered as an identifier
//!   path, so string filters on it are cast like filters on `_id`.
//!
//! ```rust,ignore
//! use docmodel::{Document, id::ObjectId};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     #[document(id)]
//!     pub id: Option<ObjectId>,
//!     pub firstname: String,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_macros;

mod document;

use proc_macro::TokenStream;
use syn::{Data, DeriveInput, parse_macro_input};

use crate::document::generate_document_for_struct;

#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let result = match &ast.data {
        Data::Struct(data) => generate_document_for_struct(&ast, data),
        Data::Enum(_) => Err(syn::Error::new_spanned(
            &ast,
            "Cannot derive Document for enums. Only structs are supported.",
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &ast,
            "Cannot derive Document for unions. Only structs are supported.",
        )),
    };

    match result {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}
