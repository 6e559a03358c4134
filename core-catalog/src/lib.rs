//! # Catalog Persistence Module
//!
//! Owns the book catalog database and provides the repository used to read
//! and write it.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema bootstrap and connection pooling
//! - Book validation rules
//! - The book repository with optimistic-concurrency updates
//! - Listing with text search, genre containment, safelisted sorting and
//!   pagination metadata

pub mod db;
pub mod error;
pub mod filters;
pub mod models;
pub mod repositories;
pub mod validation;

pub use error::{CatalogError, Result};
pub use filters::{BookFilter, Filters, SortColumn, SortDirection, SortOrder, TextMatch};
pub use models::{Book, BookPatch, NewBook, Runtime};
pub use repositories::{calculate_metadata, BookRepository, Metadata, SqliteBookRepository};
pub use validation::{FieldError, ValidationErrors, Validator};
