//! Connection lifecycle as seen through the facade.

mod common;

use docmodel::{
    DocumentStore,
    bson::doc,
    connection::ConnectionStatus,
    error::{DocumentStoreError, StoreError},
    memory::InMemoryConnector,
};

use common::{ADDRESS, User, connected_store, database};

#[tokio::test]
async fn operations_before_connect_fail_with_not_connected() {
    let store = DocumentStore::new(InMemoryConnector::new());
    let users = store.typed_collection::<User>();

    let err = users.insert(User::sample()).await.unwrap_err();
    assert_eq!(err, DocumentStoreError::Store(StoreError::NotConnected));

    let err = users.count(doc! {}).await.unwrap_err();
    assert_eq!(err.as_store(), Some(&StoreError::NotConnected));
}

#[tokio::test]
async fn a_cast_error_wins_over_the_missing_connection() {
    let store = DocumentStore::new(InMemoryConnector::new());
    let users = store.typed_collection::<User>();

    let err = users.find_one(doc! { "_id": "badObjectId" }).await.unwrap_err();

    assert!(err.is_cast());
}

#[tokio::test]
async fn connecting_twice_to_the_same_target_opens_one_session() {
    let store = connected_store().await;

    store.connect(ADDRESS).await.unwrap();
    store.connect(&format!("mongodb://{ADDRESS}")).await.unwrap();

    assert_eq!(store.connection().connector().sessions(), 1);
    assert_eq!(store.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn connecting_elsewhere_while_connected_is_refused() {
    let store = connected_store().await;

    let err = store.connect("localhost:27017/other").await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Store(StoreError::AlreadyConnected(..))));
    assert_eq!(store.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn a_malformed_target_is_a_configuration_error() {
    let store = DocumentStore::new(InMemoryConnector::new());

    let err = store.connect("localhost:27017").await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Configuration(_)));
    assert_eq!(store.status().await, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn disconnect_is_safe_to_repeat() {
    let store = connected_store().await;

    store.disconnect().await.unwrap();
    store.disconnect().await.unwrap();

    assert_eq!(store.status().await, ConnectionStatus::Disconnected);
    let err = store.typed_collection::<User>().find(doc! {}).await.unwrap_err();
    assert_eq!(err.as_store(), Some(&StoreError::NotConnected));
}

#[tokio::test]
async fn data_survives_a_reconnect() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    users.insert(User::sample()).await.unwrap();

    store.disconnect().await.unwrap();
    store.connect(ADDRESS).await.unwrap();

    assert_eq!(users.count(doc! {}).await.unwrap(), 1);
    assert_eq!(store.connection().connector().sessions(), 2);
}

#[tokio::test]
async fn an_unreachable_server_fails_connect_with_a_store_error() {
    let connector = InMemoryConnector::new();
    connector.set_unreachable(true);
    let store = DocumentStore::new(connector.clone());

    let err = store.connect(ADDRESS).await.unwrap_err();

    assert!(matches!(err.as_store(), Some(StoreError::Connection(_))));
    assert_eq!(store.status().await, ConnectionStatus::Disconnected);

    connector.set_unreachable(false);
    store.connect(ADDRESS).await.unwrap();
    assert_eq!(store.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn a_server_going_offline_surfaces_as_a_store_error() {
    let store = connected_store().await;
    let users = store.typed_collection::<User>();
    let user = users.insert(User::sample()).await.unwrap().document;

    database(&store).await.set_offline(true);

    let err = users.find_one(doc! { "_id": user.id.unwrap() }).await.unwrap_err();
    assert!(matches!(err.as_store(), Some(StoreError::Connection(_))));
    assert!(users.remove_document(&user).await.unwrap_err().is_store());

    database(&store).await.set_offline(false);
    assert!(users.find_one(doc! { "_id": user.id.unwrap() }).await.unwrap().is_some());
}

#[tokio::test]
async fn collections_are_listed_and_dropped() {
    let store = connected_store().await;
    store.typed_collection::<User>().insert(User::sample()).await.unwrap();
    store.collection("audit").insert(doc! { "event": "login" }).await.unwrap();

    assert_eq!(store.list_collections().await.unwrap(), ["audit", "users"]);

    store.drop_collection("audit").await.unwrap();
    store.drop_collection("audit").await.unwrap();

    assert_eq!(store.list_collections().await.unwrap(), ["users"]);
}
