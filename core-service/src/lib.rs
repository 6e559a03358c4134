//! Core service façade and bootstrap helpers.
//!
//! [`CatalogService`] is the entry point callers use to work with the book
//! catalog. It owns the process-wide connection pool (created once by
//! [`CatalogService::bootstrap`], closed by [`CatalogService::shutdown`]) and
//! layers the create/patch flows on top of the book repository: inputs are
//! validated before any write reaches the store, and partial updates are
//! merged onto a freshly fetched book before the version-checked write.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_catalog::db::{create_pool, DatabaseConfig};
use core_catalog::{
    Book, BookFilter, BookPatch, BookRepository, CatalogError, FieldError, Metadata, NewBook,
    SqliteBookRepository, ValidationErrors,
};
use core_runtime::config::CoreConfig;
use core_runtime::logging::redact_dsn;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Pool options derived from the process configuration.
///
/// In-memory databases always get the single-connection pool, since each
/// connection to `:memory:` would otherwise see its own empty database.
pub fn database_config(config: &CoreConfig) -> DatabaseConfig {
    if config.database_url.contains(":memory:") {
        return DatabaseConfig::in_memory().acquire_timeout(config.acquire_timeout);
    }

    DatabaseConfig::new(&config.database_url)
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .idle_timeout(Some(config.max_idle_time))
        .max_lifetime(Some(config.max_lifetime))
        .acquire_timeout(config.acquire_timeout)
}

/// Parse an expected-version token (e.g. from a request header).
///
/// Surrounding whitespace is ignored; anything other than a base-10 integer is
/// a validation failure on the `version` field.
pub fn parse_expected_version(raw: &str) -> Result<i32> {
    raw.trim().parse::<i32>().map_err(|_| {
        CoreError::from(ValidationErrors::from(FieldError::new(
            "version",
            "must be an integer",
        )))
    })
}

/// Primary façade exposed to callers.
#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookRepository>,
    pool: Option<SqlitePool>,
}

impl CatalogService {
    /// Create a service over an existing repository.
    ///
    /// The service does not own a pool in this mode; `shutdown` is a no-op.
    pub fn new(books: Arc<dyn BookRepository>) -> Self {
        Self { books, pool: None }
    }

    /// Validate `config`, open the pool, apply the schema and build the
    /// repository.
    pub async fn bootstrap(config: &CoreConfig) -> Result<Self> {
        config.validate()?;

        info!(
            environment = %config.environment,
            database_url = %redact_dsn(&config.database_url),
            query_timeout_ms = config.query_timeout.as_millis() as u64,
            "Bootstrapping catalog service"
        );

        let pool = create_pool(database_config(config)).await.map_err(|e| {
            CoreError::InitializationFailed(format!("failed to open catalog store: {}", e))
        })?;
        let books = SqliteBookRepository::new(pool.clone(), config.query_timeout);

        Ok(Self {
            books: Arc::new(books),
            pool: Some(pool),
        })
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            info!("Closing catalog connection pool");
            pool.close().await;
        }
    }

    /// Access the repository backing the service.
    pub fn books(&self) -> Arc<dyn BookRepository> {
        Arc::clone(&self.books)
    }

    /// Validate `input` and store it as a new book.
    pub async fn create_book(&self, input: NewBook) -> Result<Book> {
        let book = input.into_book()?;
        let stored = self.books.insert(&book).await?;
        info!(book_id = stored.id, "Created book");
        Ok(stored)
    }

    pub async fn show_book(&self, id: i64) -> Result<Book> {
        Ok(self.books.get(id).await?)
    }

    /// Apply `patch` to book `id`.
    ///
    /// When `expected_version` is given and no longer matches the stored
    /// version, the call fails with an edit conflict before anything is
    /// written. The merged book is fully validated before the version-checked
    /// write.
    pub async fn update_book(
        &self,
        id: i64,
        patch: BookPatch,
        expected_version: Option<i32>,
    ) -> Result<Book> {
        let mut book = self.books.get(id).await?;

        if let Some(expected) = expected_version {
            if expected != book.version {
                debug!(
                    book_id = id,
                    expected,
                    actual = book.version,
                    "Expected version is stale"
                );
                return Err(CatalogError::EditConflict {
                    entity_type: "book",
                    id,
                    version: expected,
                }
                .into());
            }
        }

        patch.apply_to(&mut book);
        book.ensure_valid()?;

        let updated = self.books.update(&book).await?;
        info!(book_id = id, version = updated.version, "Updated book");
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i64) -> Result<()> {
        self.books.delete(id).await?;
        info!(book_id = id, "Deleted book");
        Ok(())
    }

    /// Validate `filter`, then return the matching page and its metadata.
    pub async fn list_books(&self, filter: &BookFilter) -> Result<(Vec<Book>, Metadata)> {
        filter.validate()?;
        Ok(self.books.list(filter).await?)
    }
}
