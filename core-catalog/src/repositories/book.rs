//! Book repository trait and implementation

use crate::error::{CatalogError, Result};
use crate::filters::{BookFilter, SortOrder, TextMatch};
use crate::models::Book;
use crate::repositories::deadline::{is_interrupted, DeadlineConnection};
use crate::repositories::{calculate_metadata, Metadata};
use crate::validation::ValidationErrors;
use async_trait::async_trait;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{Connection, Sqlite, SqlitePool};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Deadline applied to every repository call unless configured otherwise.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

const ENTITY: &str = "book";

const BOOK_COLUMNS: &str =
    "b.id, b.created_at, b.title, b.sales, b.pages, b.year, b.runtime, b.genres, b.version";

const RETURNING_COLUMNS: &str =
    "id, created_at, title, sales, pages, year, runtime, genres, version";

/// Book repository interface for data access operations
///
/// Every call runs under the repository's query deadline and fails with
/// [`CatalogError::Timeout`] once it expires.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Persist a new book
    ///
    /// # Returns
    /// The stored book with `id`, `created_at` and `version` (always 1) assigned
    ///
    /// # Errors
    /// - `Validation` if the book breaks any rule; nothing is written
    /// - `Database` on constraint violation or connectivity failure
    async fn insert(&self, book: &Book) -> Result<Book>;

    /// Fetch a book by id
    ///
    /// Ids below 1 fail with `NotFound` without touching the store.
    async fn get(&self, id: i64) -> Result<Book>;

    /// Replace a book's fields if its stored version still equals `book.version`
    ///
    /// # Returns
    /// The row as stored after the write, carrying version `book.version + 1`
    ///
    /// # Errors
    /// - `EditConflict` if the row is gone or its version has moved on
    /// - `Validation` if the book breaks any rule; nothing is written
    async fn update(&self, book: &Book) -> Result<Book>;

    /// Delete a book by id
    ///
    /// # Errors
    /// - `NotFound` if `id < 1` or no row was deleted
    async fn delete(&self, id: i64) -> Result<()>;

    /// Query books matching a filter
    ///
    /// # Returns
    /// The requested page plus metadata computed from the total match count
    async fn list(&self, filter: &BookFilter) -> Result<(Vec<Book>, Metadata)>;
}

/// SQLite implementation of BookRepository
#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteBookRepository {
    /// Create a repository whose calls are bounded by `query_timeout`
    pub fn new(pool: SqlitePool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Create a repository using [`DEFAULT_QUERY_TIMEOUT`]
    pub fn with_default_timeout(pool: SqlitePool) -> Self {
        Self::new(pool, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Acquire a connection whose statements stop at the query deadline.
    ///
    /// Waiting for a free connection counts against the same deadline.
    async fn checkout(&self, operation: &'static str) -> Result<DeadlineConnection> {
        let deadline = Instant::now() + self.query_timeout;

        let conn = match tokio::time::timeout(self.query_timeout, self.pool.acquire()).await {
            Ok(conn) => conn.map_err(|e| self.failed(operation, e))?,
            Err(_) => return Err(self.timed_out(operation)),
        };

        DeadlineConnection::arm(conn, deadline)
            .await
            .map_err(|e| self.failed(operation, e))
    }

    /// Hand the connection back and classify the statement outcome.
    ///
    /// An interrupted statement becomes [`CatalogError::Timeout`].
    async fn settle<T>(
        &self,
        operation: &'static str,
        conn: DeadlineConnection,
        result: std::result::Result<T, sqlx::Error>,
    ) -> Result<T> {
        conn.release().await;
        match result {
            Ok(value) => Ok(value),
            Err(e) if is_interrupted(&e) => Err(self.timed_out(operation)),
            Err(e) => Err(self.failed(operation, e)),
        }
    }

    fn timed_out(&self, operation: &'static str) -> CatalogError {
        warn!(
            operation,
            timeout_ms = self.query_timeout.as_millis() as u64,
            "Book query timed out"
        );
        CatalogError::Timeout {
            operation,
            timeout: self.query_timeout,
        }
    }

    fn failed(&self, operation: &'static str, err: sqlx::Error) -> CatalogError {
        warn!(operation, error = %err, "Book query failed");
        CatalogError::Database(err)
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn insert(&self, book: &Book) -> Result<Book> {
        book.ensure_valid()?;

        let sql = format!(
            "INSERT INTO books (title, sales, pages, year, runtime, genres) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
            RETURNING_COLUMNS
        );

        let mut conn = self.checkout("insert").await?;
        let result = sqlx::query_as::<_, Book>(&sql)
            .bind(&book.title)
            .bind(book.sales)
            .bind(book.pages)
            .bind(book.year)
            .bind(book.runtime)
            .bind(Json(&book.genres))
            .fetch_one(&mut *conn)
            .await;
        let stored = self.settle("insert", conn, result).await?;

        debug!(book_id = stored.id, title = %stored.title, "Inserted book");
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Book> {
        if id < 1 {
            return Err(CatalogError::NotFound {
                entity_type: ENTITY,
                id,
            });
        }

        let sql = format!("SELECT {} FROM books b WHERE b.id = ?", BOOK_COLUMNS);

        let mut conn = self.checkout("get").await?;
        let result = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await;
        let book = self.settle("get", conn, result).await?;

        match book {
            Some(book) => {
                debug!(book_id = id, version = book.version, "Fetched book");
                Ok(book)
            }
            None => Err(CatalogError::NotFound {
                entity_type: ENTITY,
                id,
            }),
        }
    }

    async fn update(&self, book: &Book) -> Result<Book> {
        book.ensure_valid()?;

        // Single conditional write: the version check and the bump happen in
        // the same statement.
        let sql = format!(
            "UPDATE books \
             SET title = ?, sales = ?, pages = ?, year = ?, runtime = ?, genres = ?, \
                 version = version + 1 \
             WHERE id = ? AND version = ? \
             RETURNING {}",
            RETURNING_COLUMNS
        );

        let mut conn = self.checkout("update").await?;
        let result = sqlx::query_as::<_, Book>(&sql)
            .bind(&book.title)
            .bind(book.sales)
            .bind(book.pages)
            .bind(book.year)
            .bind(book.runtime)
            .bind(Json(&book.genres))
            .bind(book.id)
            .bind(book.version)
            .fetch_optional(&mut *conn)
            .await;
        let updated = self.settle("update", conn, result).await?;

        match updated {
            Some(updated) => {
                debug!(book_id = updated.id, version = updated.version, "Updated book");
                Ok(updated)
            }
            None => {
                debug!(
                    book_id = book.id,
                    expected_version = book.version,
                    "Book update lost version check"
                );
                Err(CatalogError::EditConflict {
                    entity_type: ENTITY,
                    id: book.id,
                    version: book.version,
                })
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(CatalogError::NotFound {
                entity_type: ENTITY,
                id,
            });
        }

        let mut conn = self.checkout("delete").await?;
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await;
        let rows_affected = self.settle("delete", conn, result).await?.rows_affected();

        if rows_affected == 0 {
            return Err(CatalogError::NotFound {
                entity_type: ENTITY,
                id,
            });
        }

        debug!(book_id = id, "Deleted book");
        Ok(())
    }

    async fn list(&self, filter: &BookFilter) -> Result<(Vec<Book>, Metadata)> {
        filter.validate()?;
        let order = filter
            .filters
            .sort_order()
            .map_err(ValidationErrors::from)?;

        let spec = build_book_query_spec(filter, order);

        let mut conn = self.checkout("list").await?;
        let result = async {
            // Count and page are read from the same snapshot
            let mut tx = conn.begin().await?;

            let count_query = sqlx::query_scalar::<_, i64>(&spec.count_sql);
            let total = bind_scalar(count_query, &spec.binds)
                .fetch_one(&mut *tx)
                .await?;

            let page_query = sqlx::query_as::<_, Book>(&spec.select_sql);
            let books = bind_rows(page_query, &spec.binds)
                .bind(filter.filters.limit())
                .bind(filter.filters.offset())
                .fetch_all(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>((books, total))
        }
        .await;
        let (books, total) = self.settle("list", conn, result).await?;

        let metadata = calculate_metadata(total, filter.filters.page, filter.filters.page_size);

        debug!(
            returned = books.len(),
            total_records = total,
            page = filter.filters.page,
            sort = %order,
            "Listed books"
        );

        Ok((books, metadata))
    }
}

#[derive(Debug, Clone)]
struct BookQuerySpec {
    select_sql: String,
    count_sql: String,
    binds: Vec<BindValue>,
}

#[derive(Debug, Clone)]
enum BindValue {
    Text(String),
    I32(i32),
}

type SqliteQueryAs<'q, O> = QueryAs<'q, Sqlite, O, SqliteArguments<'q>>;
type SqliteQueryScalar<'q, O> = QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>;

fn bind_rows<'q, O>(
    mut query: SqliteQueryAs<'q, O>,
    binds: &'q [BindValue],
) -> SqliteQueryAs<'q, O> {
    for bind in binds {
        query = match bind {
            BindValue::Text(value) => query.bind(value.as_str()),
            BindValue::I32(value) => query.bind(*value),
        };
    }
    query
}

fn bind_scalar<'q, O>(
    mut query: SqliteQueryScalar<'q, O>,
    binds: &'q [BindValue],
) -> SqliteQueryScalar<'q, O> {
    for bind in binds {
        query = match bind {
            BindValue::Text(value) => query.bind(value.as_str()),
            BindValue::I32(value) => query.bind(*value),
        };
    }
    query
}

fn build_book_query_spec(filter: &BookFilter, order: SortOrder) -> BookQuerySpec {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    match filter.text_match() {
        TextMatch::Any => {}
        TextMatch::Expression(expression) => {
            conditions.push("b.id IN (SELECT rowid FROM books_fts WHERE books_fts MATCH ?)");
            binds.push(BindValue::Text(expression));
        }
        TextMatch::Nothing => conditions.push("0 = 1"),
    }

    if !filter.genres.is_empty() {
        // Every requested genre must appear in the row's genre array
        conditions.push(
            "NOT EXISTS (SELECT 1 FROM json_each(?) AS wanted \
             WHERE wanted.value NOT IN (SELECT value FROM json_each(b.genres)))",
        );
        binds.push(BindValue::Text(genres_json(&filter.genres)));
    }

    if let Some(min_sales) = filter.min_sales {
        conditions.push("b.sales >= ?");
        binds.push(BindValue::I32(min_sales));
    }

    if let Some(max_sales) = filter.max_sales {
        conditions.push("b.sales <= ?");
        binds.push(BindValue::I32(max_sales));
    }

    if let Some(min_pages) = filter.min_pages {
        conditions.push("b.pages >= ?");
        binds.push(BindValue::I32(min_pages));
    }

    if let Some(max_pages) = filter.max_pages {
        conditions.push("b.pages <= ?");
        binds.push(BindValue::I32(max_pages));
    }

    let mut where_clause = String::new();
    if !conditions.is_empty() {
        where_clause.push_str(" WHERE ");
        where_clause.push_str(&conditions.join(" AND "));
    }

    let select_sql = format!(
        "SELECT {} FROM books b{} ORDER BY {} LIMIT ? OFFSET ?",
        BOOK_COLUMNS,
        where_clause,
        order.order_by_sql()
    );
    let count_sql = format!("SELECT COUNT(*) FROM books b{}", where_clause);

    BookQuerySpec {
        select_sql,
        count_sql,
        binds,
    }
}

fn genres_json(genres: &[String]) -> String {
    // Serializing a slice of strings cannot fail
    serde_json::to_string(genres).unwrap_or_else(|_| "[]".to_string())
}
