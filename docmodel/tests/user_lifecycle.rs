//! End-to-end walk through the user model: save, look up, update, count, stream and remove.

mod common;

use docmodel::{
    bson::doc,
    cursor::CursorEvent,
    document::Document,
    error::CastError,
    id::ObjectId,
    query::Query,
};

use common::{User, connected_store};

#[test]
fn generated_identifiers_are_distinct_and_round_trip() {
    let first = ObjectId::new();
    let second = ObjectId::new();

    assert_ne!(first, second);
    assert_eq!(first.to_string().len(), 24);
    assert_eq!(first.to_string().parse::<ObjectId>().unwrap(), first);
}

#[tokio::test]
async fn find_one_with_a_bad_identifier_is_a_cast_error() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();

    let err = users.find_one(doc! { "_id": "badObjectId" }).await.unwrap_err();
    let cast = err.as_cast().unwrap();

    assert_eq!(
        cast.message(),
        "Cast to ObjectId failed for value \"badObjectId\" at path \"_id\""
    );
    assert_eq!(cast.name(), CastError::NAME);
    assert_eq!(cast.kind, "ObjectId");
    assert_eq!(cast.value, "badObjectId");
    assert_eq!(cast.path, "_id");
    assert!(!err.is_store());
}

#[tokio::test]
async fn an_unknown_identifier_matches_nothing() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    users.insert(User::sample()).await.unwrap();

    let missing = ObjectId::new();

    assert_eq!(users.find_one(doc! { "_id": missing }).await.unwrap(), None);
    assert!(users.find(doc! { "_id": missing }).await.unwrap().is_empty());
}

#[tokio::test]
async fn find_one_by_identifier_or_by_its_text() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let saved = users.insert(User::sample()).await.unwrap().document;
    let id = saved.id.unwrap();

    let by_id = users.find_one(doc! { "_id": id }).await.unwrap().unwrap();
    assert_eq!(by_id.firstname, "Firstname");
    assert_eq!(by_id.lastname, "Lastname");
    assert_eq!(by_id.address.street, "3 rue de l'Eglise");
    assert_eq!(by_id.address.city, "Paris");

    let by_text = users.find_one(doc! { "_id": id.to_string() }).await.unwrap().unwrap();
    assert_eq!(by_text, by_id);
}

#[tokio::test]
async fn save_assigns_an_identifier_and_reports_one_write() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();

    let outcome = users.insert(User::sample()).await.unwrap();

    assert_eq!(outcome.inserted_count, 1);
    assert!(outcome.document.id.is_some());
}

#[tokio::test]
async fn save_keeps_a_caller_supplied_identifier() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let id = ObjectId::new();

    let saved = users
        .insert(User { id: Some(id), ..User::sample() })
        .await
        .unwrap()
        .document;

    assert_eq!(saved.id, Some(id));
    assert_eq!(users.find_one(doc! { "_id": id }).await.unwrap().unwrap().id, Some(id));
}

#[tokio::test]
async fn saving_the_same_identifier_twice_is_a_store_error() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let user = users.insert(User::sample()).await.unwrap().document;

    let err = users.insert(user).await.unwrap_err();

    assert!(err.is_store());
    assert_eq!(users.count(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn update_changes_only_the_named_fields() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let id = users.insert(User::sample()).await.unwrap().document.id.unwrap();

    let status = users
        .update(doc! { "_id": id }, doc! { "firstname": "newFirstname" })
        .await
        .unwrap();
    assert_eq!(status.matched_count, 1);
    assert_eq!(status.modified_count, 1);

    let updated = users.find_one(doc! { "_id": id }).await.unwrap().unwrap();
    assert_eq!(updated.firstname, "newFirstname");
    assert_eq!(updated.lastname, "Lastname");
    assert_eq!(updated.address, User::sample().address);
}

#[tokio::test]
async fn update_with_identical_values_matches_without_modifying() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let id = users.insert(User::sample()).await.unwrap().document.id.unwrap();

    let status = users
        .update(doc! { "_id": id }, doc! { "firstname": "Firstname" })
        .await
        .unwrap();

    assert_eq!(status.matched_count, 1);
    assert_eq!(status.modified_count, 0);
}

#[tokio::test]
async fn update_reaches_into_nested_documents() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let id = users.insert(User::sample()).await.unwrap().document.id.unwrap();

    users
        .update(doc! { "_id": id.to_hex() }, doc! { "address.city": "Lyon" })
        .await
        .unwrap();

    let moved = users.find_one(doc! { "address.city": "Lyon" }).await.unwrap().unwrap();
    assert_eq!(moved.address.street, "3 rue de l'Eglise");
}

#[tokio::test]
async fn update_without_a_match_is_not_an_error() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();

    let status = users
        .update(doc! { "_id": ObjectId::new() }, doc! { "firstname": "nobody" })
        .await
        .unwrap();

    assert_eq!(status.matched_count, 0);
    assert_eq!(status.modified_count, 0);
}

#[tokio::test]
async fn count_sees_every_saved_user() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    for _ in 0..3 {
        users.insert(User::sample()).await.unwrap();
    }

    assert_eq!(users.count(doc! {}).await.unwrap(), 3);
    assert_eq!(users.count(doc! { "firstname": "nobody" }).await.unwrap(), 0);
}

#[tokio::test]
async fn stream_delivers_each_user_then_closes() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    for _ in 0..3 {
        users.insert(User::sample()).await.unwrap();
    }

    let mut data = 0;
    let mut errors = 0;
    let mut closes = 0;

    let delivered = users
        .find_stream(Query::all())
        .await
        .unwrap()
        .observe(|event| match event {
            CursorEvent::Data(user) => {
                assert_eq!(user.firstname, "Firstname");
                data += 1;
            }
            CursorEvent::Error(_) => errors += 1,
            CursorEvent::Close => {
                assert_eq!(data, 3);
                closes += 1;
            }
        })
        .await;

    assert_eq!(delivered, 3);
    assert_eq!((errors, closes), (0, 1));
}

#[tokio::test]
async fn remove_returns_the_stored_snapshot() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let user = users.insert(User::sample()).await.unwrap().document;

    let removed = users.remove_document(&user).await.unwrap().unwrap();

    assert_eq!(removed.firstname, user.firstname);
    assert_eq!(removed.lastname, user.lastname);
    assert_eq!(removed.id, user.id);
    assert_eq!(users.find_one(doc! { "_id": user.id.unwrap() }).await.unwrap(), None);
    assert_eq!(users.remove_document(&user).await.unwrap(), None);
}

#[tokio::test]
async fn remove_by_filter_reports_the_deleted_count() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    users.insert(User::sample()).await.unwrap();
    users.insert(User { firstname: "Other".to_string(), ..User::sample() }).await.unwrap();

    assert_eq!(users.remove(doc! { "firstname": "Other" }).await.unwrap().deleted_count, 1);
    assert_eq!(users.remove(doc! {}).await.unwrap().deleted_count, 1);
    assert_eq!(users.remove(doc! {}).await.unwrap().deleted_count, 0);
}

#[tokio::test]
async fn every_operation_rejects_a_malformed_identifier_the_same_way() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let expected = "Cast to ObjectId failed for value \"123\" at path \"_id\"";

    let errors = [
        users.find(doc! { "_id": "123" }).await.unwrap_err(),
        users.count(doc! { "_id": "123" }).await.unwrap_err(),
        users.update(doc! { "_id": "123" }, doc! { "firstname": "x" }).await.unwrap_err(),
        users.remove(doc! { "_id": "123" }).await.unwrap_err(),
        users.find_stream(doc! { "_id": "123" }).await.unwrap_err(),
    ];

    for err in errors {
        assert_eq!(err.as_cast().map(|cast| cast.message()).as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn untyped_collections_share_the_stored_documents() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let id = users.insert(User::sample()).await.unwrap().document.id.unwrap();

    let raw = store.collection(User::collection_name());
    let document = raw.find_one(doc! { "_id": id.to_hex() }).await.unwrap().unwrap();

    assert_eq!(document.get_str("firstname").unwrap(), "Firstname");
    assert_eq!(document.get_document("address").unwrap().get_str("city").unwrap(), "Paris");
}
