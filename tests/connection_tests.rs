/// Connection lifecycle tests
///
/// Fault injection on the in-process store exercises the classified
/// failure envelopes and the reconnect-after-fault behavior.
/// Run with: cargo test --test connection_tests
use std::time::Duration;

use mongodeck::{
    AdminService, ConnState, DbError, ErrorKind, MemoryStore, PageRequest, ServiceConfig,
};

fn service_with(config: ServiceConfig) -> AdminService<MemoryStore> {
    AdminService::new(MemoryStore::new(), &config)
}

fn service() -> AdminService<MemoryStore> {
    service_with(ServiceConfig::default())
}

#[tokio::test]
async fn test_connection_is_opened_once_and_reused() {
    let service = service();

    service.list_databases().await.into_result().unwrap();
    service.server_info().await.into_result().unwrap();
    service
        .fetch_page("shop", "orders", PageRequest::default())
        .await
        .into_result()
        .unwrap();

    assert_eq!(service.store().connect_count(), 1);
    assert_eq!(service.connection().state(), ConnState::Connected);
}

#[tokio::test]
async fn test_refused_connection_fails_every_operation() {
    let service = service();
    service
        .store()
        .fail_connects(Some(DbError::ConnectionRefused("no route to host".into())));

    let listing = service.list_databases().await;
    assert!(!listing.ok);
    assert_eq!(listing.error().unwrap().kind, ErrorKind::ConnectionRefused);
    assert!(listing.error().unwrap().kind.is_connection());

    let page = service
        .fetch_page("shop", "orders", PageRequest::default())
        .await;
    assert_eq!(page.error().unwrap().kind, ErrorKind::ConnectionRefused);

    let insert = service.insert_document("shop", "orders", r#"{"v": 1}"#).await;
    assert_eq!(insert.error().unwrap().kind, ErrorKind::ConnectionRefused);

    let info = service.server_info().await;
    assert_eq!(info.error().unwrap().kind, ErrorKind::ConnectionRefused);

    assert_eq!(service.connection().state(), ConnState::Unconnected);
}

#[tokio::test]
async fn test_slow_connect_is_classified_as_timeout() {
    let config = ServiceConfig::default().connect_timeout(Duration::from_millis(20));
    let service = service_with(config);
    service
        .store()
        .delay_connects(Some(Duration::from_millis(200)));

    let outcome = service.list_databases().await;
    assert!(!outcome.ok);
    assert_eq!(outcome.error().unwrap().kind, ErrorKind::Timeout);
    assert_eq!(service.connection().state(), ConnState::Unconnected);
}

#[tokio::test]
async fn test_recovery_after_fault_clears() {
    let service = service();
    service
        .store()
        .fail_connects(Some(DbError::ConnectionRefused("down".into())));

    assert!(!service.list_databases().await.ok);

    service.store().fail_connects(None);

    let outcome = service.list_databases().await;
    assert!(outcome.ok);
    assert!(service.store().connect_count() >= 2);
    assert_eq!(service.connection().state(), ConnState::Connected);
}

#[tokio::test]
async fn test_operation_fault_marks_connection_dead() {
    let service = service();

    service
        .insert_document("shop", "orders", r#"{"v": 1}"#)
        .await
        .into_result()
        .unwrap();
    assert_eq!(service.store().connect_count(), 1);

    service
        .store()
        .fail_operations(Some(DbError::Query("lost the socket".into())));
    let outcome = service.list_collections("shop").await;
    assert!(!outcome.ok);
    assert_eq!(service.connection().state(), ConnState::Unconnected);

    // the next operation reconnects
    service.store().fail_operations(None);
    service.list_collections("shop").await.into_result().unwrap();
    assert_eq!(service.store().connect_count(), 2);
    assert_eq!(service.connection().state(), ConnState::Connected);
}

#[tokio::test]
async fn test_connect_failures_do_not_reach_the_store_operations() {
    let service = service();
    service
        .store()
        .fail_connects(Some(DbError::Timeout("handshake stalled".into())));

    // ensure_connected short-circuits; the delete never runs, so nothing
    // is removed once the connection recovers
    let outcome = service.delete_all_documents("shop", "orders").await;
    assert_eq!(outcome.error().unwrap().kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn test_malformed_input_does_not_touch_the_connection() {
    let service = service();
    service.list_databases().await.into_result().unwrap();
    assert_eq!(service.connection().state(), ConnState::Connected);

    let outcome = service.insert_document("shop", "orders", "{oops").await;
    assert_eq!(outcome.error().unwrap().kind, ErrorKind::MalformedInput);

    // parse failures are caught before the connection is involved
    assert_eq!(service.connection().state(), ConnState::Connected);
    assert_eq!(service.store().connect_count(), 1);
}
