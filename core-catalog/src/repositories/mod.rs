//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations. Callers depend on the
//! trait (`BookRepository`) so tests can substitute doubles for the store.
//!
//! ## Available Repositories
//!
//! - `BookRepository` - Catalog books with optimistic-concurrency updates and
//!   filtered, paginated listing

pub mod book;
mod deadline;
pub mod pagination;

pub use book::{BookRepository, SqliteBookRepository, DEFAULT_QUERY_TIMEOUT};
pub use pagination::{calculate_metadata, Metadata};
