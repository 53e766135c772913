//! `#[derive(Document)]` on a few model shapes.

mod common;

use docmodel::{
    Document,
    bson::{doc, oid},
    document::{Document as _, DocumentExt},
    id::ObjectId,
};
use serde::{Deserialize, Serialize};

use common::{User, connected_store};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
struct Comment {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(rename = "authorId")]
    author: ObjectId,
    reply_to: Option<ObjectId>,
    body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[serde(rename_all = "camelCase")]
struct Invoice {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    billed_to: ObjectId,
    total_cents: i64,
}

#[test]
fn collection_name_comes_from_the_attribute_or_the_type() {
    assert_eq!(User::collection_name(), "users");
    assert_eq!(Comment::collection_name(), "comments");
}

#[test]
fn identifier_fields_become_cast_paths() {
    assert_eq!(User::id_paths(), ["_id"]);
    assert_eq!(Comment::id_paths(), ["_id", "authorId", "reply_to"]);
}

#[test]
fn a_required_identifier_is_always_present() {
    let id = ObjectId::new();
    let mut comment = Comment { id, author: ObjectId::new(), reply_to: None, body: "hi".to_string() };

    assert_eq!(comment.id(), Some(&id));
    assert_eq!(comment.ensure_id(), id);

    let replacement = ObjectId::new();
    comment.set_id(replacement);
    assert_eq!(comment.id, replacement);
}

#[test]
fn an_optional_identifier_is_assigned_once() {
    let mut user = User::sample();
    assert_eq!(user.id(), None);

    let id = user.ensure_id();

    assert_eq!(user.id, Some(id));
    assert_eq!(user.ensure_id(), id);
    assert_eq!(user.to_bson_document().unwrap().get_object_id("_id").unwrap(), oid::ObjectId::from(id));
}

#[tokio::test]
async fn filters_on_secondary_identifier_fields_are_cast() {
    let store = connected_store().await;
    let comments = store.typed_collection::<Comment>();
    let author = ObjectId::new();
    comments
        .insert(Comment { id: ObjectId::new(), author, reply_to: None, body: "first".to_string() })
        .await
        .unwrap();

    let found = comments.find(doc! { "authorId": author.to_hex() }).await.unwrap();
    assert_eq!(found.len(), 1);

    let err = comments.find(doc! { "authorId": "someone" }).await.unwrap_err();
    assert_eq!(err.as_cast().map(|cast| cast.path.as_str()), Some("authorId"));
}

#[test]
fn renamed_fields_are_cast_under_their_serialized_name() {
    assert_eq!(Invoice::id_paths(), ["_id", "billedTo"]);

    let invoice = Invoice { id: None, billed_to: ObjectId::new(), total_cents: 1200 };
    let stored = invoice.to_bson_document().unwrap();
    assert!(stored.contains_key("billedTo"));
}

#[tokio::test]
async fn renamed_identifier_fields_accept_hex_filters() {
    let store = connected_store().await;
    let invoices = store.typed_collection::<Invoice>();
    let customer = ObjectId::new();
    invoices
        .insert(Invoice { id: None, billed_to: customer, total_cents: 1200 })
        .await
        .unwrap();

    let found = invoices.find(doc! { "billedTo": customer.to_hex() }).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].billed_to, customer);
}
