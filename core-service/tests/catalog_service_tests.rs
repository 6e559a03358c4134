//! End-to-end tests for the catalog service over an in-memory store

use core_catalog::{BookFilter, BookPatch, Filters, NewBook, Runtime};
use core_runtime::config::CoreConfig;
use core_service::{parse_expected_version, CatalogService};
use std::time::Duration;

async fn bootstrap() -> CatalogService {
    let config = CoreConfig::builder()
        .database_url("sqlite::memory:")
        .query_timeout(Duration::from_secs(3))
        .build()
        .unwrap();
    CatalogService::bootstrap(&config).await.unwrap()
}

fn new_book(title: &str, year: i32, genres: &[&str]) -> NewBook {
    NewBook {
        title: title.to_string(),
        sales: 10,
        pages: 200,
        year,
        runtime: Runtime(90),
        genres: Some(genres.iter().map(|g| g.to_string()).collect()),
    }
}

#[tokio::test]
async fn test_book_lifecycle() {
    let service = bootstrap().await;

    let created = service
        .create_book(new_book("Dune", 1965, &["scifi"]))
        .await
        .unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.version, 1);

    let shown = service.show_book(created.id).await.unwrap();
    assert_eq!(shown, created);

    let expected = parse_expected_version("1").unwrap();
    let patch = BookPatch {
        sales: Some(250),
        ..BookPatch::default()
    };
    let updated = service
        .update_book(created.id, patch, Some(expected))
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.sales, 250);
    assert_eq!(updated.title, "Dune");

    // A client still holding version 1 is turned away
    let err = service
        .update_book(created.id, BookPatch::default(), Some(1))
        .await
        .unwrap_err();
    assert_eq!(err.status_hint(), 409);

    service.delete_book(created.id).await.unwrap();
    assert_eq!(
        service.show_book(created.id).await.unwrap_err().status_hint(),
        404
    );
    assert_eq!(
        service.delete_book(created.id).await.unwrap_err().status_hint(),
        404
    );

    service.shutdown().await;
}

#[tokio::test]
async fn test_list_books_through_service() {
    let service = bootstrap().await;
    for (title, year, genres) in [
        ("Dune", 1965, &["scifi", "classic"][..]),
        ("Emma", 1890, &["romance", "classic"][..]),
        ("Piranesi", 2020, &["fantasy"][..]),
    ] {
        service
            .create_book(new_book(title, year, genres))
            .await
            .unwrap();
    }

    let filter = BookFilter::new(Filters::new(1, 2, "-year")).with_genres(["classic"]);
    let (books, metadata) = service.list_books(&filter).await.unwrap();
    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "Emma"]);
    assert_eq!(metadata.total_records, 2);
    assert_eq!(metadata.last_page, 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_bootstrap_rejects_invalid_config() {
    let config = CoreConfig {
        max_connections: 0,
        ..CoreConfig::builder()
            .database_url("sqlite::memory:")
            .build()
            .unwrap()
    };

    let err = match CatalogService::bootstrap(&config).await {
        Ok(_) => panic!("bootstrap should fail"),
        Err(e) => e,
    };
    assert_eq!(err.status_hint(), 500);
}
