/// Pagination behavior tests
///
/// Run with: cargo test --test pagination_tests
use mongodb::bson::Bson;
use mongodeck::{AdminService, DbError, MemoryStore, PageRequest, ServiceConfig};

fn service() -> AdminService<MemoryStore> {
    AdminService::new(MemoryStore::new(), &ServiceConfig::default())
}

/// Seed documents {"n": 1} .. {"n": total} in insertion order.
async fn seed(service: &AdminService<MemoryStore>, total: usize) {
    for n in 1..=total {
        service
            .insert_document("paging", "items", &format!(r#"{{"n": {n}}}"#))
            .await
            .into_result()
            .unwrap();
    }
}

fn numbers(page: &mongodeck::Page) -> Vec<i64> {
    page.documents
        .iter()
        .map(|document| match document.get("n") {
            Some(Bson::Int32(v)) => *v as i64,
            Some(Bson::Int64(v)) => *v,
            other => panic!("unexpected n value: {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn test_second_page_of_twelve() {
    let service = service();
    seed(&service, 12).await;

    let page = service
        .fetch_page("paging", "items", PageRequest::new(2, 5))
        .await
        .into_result()
        .unwrap();

    assert_eq!(page.pagination.total, 12);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.page, 2);
    assert_eq!(numbers(&page), vec![6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn test_last_page_is_partial() {
    let service = service();
    seed(&service, 12).await;

    let page = service
        .fetch_page("paging", "items", PageRequest::new(3, 5))
        .await
        .into_result()
        .unwrap();

    assert_eq!(numbers(&page), vec![11, 12]);
}

#[tokio::test]
async fn test_fetch_is_idempotent() {
    let service = service();
    seed(&service, 7).await;

    let first = service
        .fetch_page("paging", "items", PageRequest::new(1, 5))
        .await
        .into_result()
        .unwrap();
    let second = service
        .fetch_page("paging", "items", PageRequest::new(1, 5))
        .await
        .into_result()
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_collection() {
    let service = service();

    let page = service
        .fetch_page("paging", "missing", PageRequest::default())
        .await
        .into_result()
        .unwrap();

    assert!(page.documents.is_empty());
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.total_pages, 0);
}

#[tokio::test]
async fn test_page_beyond_range_is_empty_but_counted() {
    let service = service();
    seed(&service, 3).await;

    let page = service
        .fetch_page("paging", "items", PageRequest::new(5, 10))
        .await
        .into_result()
        .unwrap();

    assert!(page.documents.is_empty());
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 1);
    assert_eq!(page.pagination.page, 5);
}

#[tokio::test]
async fn test_out_of_range_request_is_clamped() {
    let service = service();
    seed(&service, 3).await;

    let page = service
        .fetch_page("paging", "items", PageRequest::new(0, 0))
        .await
        .into_result()
        .unwrap();

    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.page_size, 1);
    assert_eq!(numbers(&page), vec![1]);
}

#[tokio::test]
async fn test_search_is_paginated_like_fetch() {
    let service = service();
    for n in 1..=12 {
        let status = if n % 2 == 0 { "even" } else { "odd" };
        service
            .insert_document(
                "paging",
                "items",
                &format!(r#"{{"n": {n}, "status": "{status}"}}"#),
            )
            .await
            .into_result()
            .unwrap();
    }

    let page = service
        .search("paging", "items", "status", "even", PageRequest::new(2, 2))
        .await
        .into_result()
        .unwrap();

    assert_eq!(page.pagination.total, 6);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(numbers(&page), vec![6, 8]);
}

#[tokio::test]
async fn test_fetch_failure_resets_to_an_empty_first_page() {
    let service = service();
    seed(&service, 12).await;

    service
        .store()
        .fail_operations(Some(DbError::Query("backend exploded".into())));

    let outcome = service
        .fetch_page("paging", "items", PageRequest::new(2, 5))
        .await;

    assert!(!outcome.ok);
    let page = outcome.data().unwrap();
    assert!(page.documents.is_empty());
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.total_pages, 0);
}
