//! Domain models for the book catalog
//!
//! This module contains the `Book` entity with its validation rules and
//! database mapping, plus the input shapes used to create and patch books.

use crate::validation::{unique, FieldError, ValidationErrors, Validator};
use chrono::{DateTime, Datelike, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Earliest accepted publication year.
pub const MIN_YEAR: i32 = 1888;
/// Maximum title length in bytes.
pub const MAX_TITLE_BYTES: usize = 500;
/// Maximum page count.
pub const MAX_PAGES: i32 = 10_000;
/// Maximum number of genres per book.
pub const MAX_GENRES: usize = 5;

// =============================================================================
// Runtime
// =============================================================================

/// Running time in minutes.
///
/// Serialized in JSON as `"<n> mins"`; stored as a plain integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl From<i32> for Runtime {
    fn from(minutes: i32) -> Self {
        Self(minutes)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let minutes = raw
            .strip_suffix(" mins")
            .and_then(|n| n.parse::<i32>().ok())
            .ok_or_else(|| de::Error::custom("invalid runtime format, expected \"<n> mins\""))?;
        Ok(Runtime(minutes))
    }
}

// =============================================================================
// Book
// =============================================================================

/// A catalog book.
///
/// `id`, `created_at` and `version` are owned by the store: they are assigned
/// on insert and `version` is bumped by exactly one on every successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub sales: i32,
    pub pages: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[sqlx(json)]
    pub genres: Vec<String>,
    pub version: i32,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

impl Book {
    /// Create an unsaved book. Store-owned fields are left at their zero values.
    pub fn new(
        title: impl Into<String>,
        year: i32,
        runtime: impl Into<Runtime>,
        genres: Vec<String>,
    ) -> Self {
        Self {
            id: 0,
            created_at: DateTime::<Utc>::default(),
            title: title.into(),
            sales: 0,
            pages: 0,
            year,
            runtime: runtime.into(),
            genres,
            version: 0,
        }
    }

    pub fn with_sales(mut self, sales: i32) -> Self {
        self.sales = sales;
        self
    }

    pub fn with_pages(mut self, pages: i32) -> Self {
        self.pages = pages;
        self
    }

    /// Every rule violation for this book; empty when valid.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut v = Validator::new();
        validate_book(&mut v, self);
        v.into_errors()
    }

    /// `Err` with the full violation list when the book is invalid.
    pub fn ensure_valid(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        validate_book(&mut v, self);
        v.finish()
    }

    /// Whether two books carry the same genre set, ignoring order.
    pub fn same_genres(&self, other: &Book) -> bool {
        let mut mine: Vec<&str> = self.genres.iter().map(String::as_str).collect();
        let mut theirs: Vec<&str> = other.genres.iter().map(String::as_str).collect();
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

/// Check every book rule against the current calendar year.
pub fn validate_book(v: &mut Validator, book: &Book) {
    validate_book_for_year(v, book, Utc::now().year());
}

/// Check every book rule, treating `current_year` as the latest valid year.
pub fn validate_book_for_year(v: &mut Validator, book: &Book, current_year: i32) {
    v.check(!book.title.is_empty(), "title", "must be provided");
    v.check(
        book.title.len() <= MAX_TITLE_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(book.year != 0, "year", "must be provided");
    v.check(book.year >= MIN_YEAR, "year", "must be 1888 or later");
    v.check(book.year <= current_year, "year", "must not be in the future");

    v.check(book.runtime.0 != 0, "runtime", "must be provided");
    v.check(book.runtime.0 > 0, "runtime", "must be a positive integer");

    v.check(!book.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        book.genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(unique(&book.genres), "genres", "must not contain duplicate values");

    v.check(book.sales >= 0, "sales", "must not be negative");
    v.check(book.pages >= 0, "pages", "must not be negative");
    v.check(book.pages <= MAX_PAGES, "pages", "must not be more than 10000");
}

// =============================================================================
// Inputs
// =============================================================================

/// Fields a caller supplies when creating a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sales: i32,
    #[serde(default)]
    pub pages: i32,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
}

impl NewBook {
    /// Validate the input and turn it into an unsaved [`Book`].
    ///
    /// A missing `genres` list is reported as "must be provided" rather than
    /// as an empty list.
    pub fn into_book(self) -> Result<Book, ValidationErrors> {
        let mut v = Validator::new();
        v.check(self.genres.is_some(), "genres", "must be provided");

        let book = Book::new(self.title, self.year, self.runtime, self.genres.unwrap_or_default())
            .with_sales(self.sales)
            .with_pages(self.pages);

        validate_book(&mut v, &book);
        v.finish().map(|_| book)
    }
}

/// A partial update: each field is independently present or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self == &BookPatch::default()
    }

    /// Copy every present field onto `book`, leaving the rest untouched.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(sales) = self.sales {
            book.sales = sales;
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(runtime) = self.runtime {
            book.runtime = runtime;
        }
        if let Some(genres) = &self.genres {
            book.genres = genres.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Book {
        Book::new("Dune", 1965, 1, vec!["scifi".to_string()])
            .with_sales(100)
            .with_pages(412)
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_book_has_no_errors() {
        assert!(dune().validate().is_empty());
        assert!(dune().ensure_valid().is_ok());
    }

    #[test]
    fn test_all_failures_reported_together() {
        let book = Book {
            title: String::new(),
            year: 0,
            runtime: Runtime(0),
            genres: vec![],
            sales: -1,
            pages: 10_001,
            ..dune()
        };

        let errors = book.validate();
        assert_eq!(
            fields(&errors),
            vec!["title", "year", "runtime", "genres", "sales", "pages"]
        );
        assert_eq!(errors[1].message, "must be provided");
    }

    #[test]
    fn test_title_byte_limit() {
        let mut book = dune();
        book.title = "a".repeat(500);
        assert!(book.validate().is_empty());

        // 2-byte characters: 251 chars = 502 bytes
        book.title = "é".repeat(251);
        let errors = book.validate();
        assert_eq!(errors[0].message, "must not be more than 500 bytes long");
    }

    #[test]
    fn test_year_bounds() {
        let mut v = Validator::new();
        let mut book = dune();
        book.year = 1887;
        validate_book_for_year(&mut v, &book, 2026);
        assert_eq!(v.errors()[0].message, "must be 1888 or later");

        let mut v = Validator::new();
        book.year = 2027;
        validate_book_for_year(&mut v, &book, 2026);
        assert_eq!(v.errors()[0].message, "must not be in the future");

        let mut v = Validator::new();
        book.year = 1888;
        validate_book_for_year(&mut v, &book, 2026);
        assert!(v.is_valid());
    }

    #[test]
    fn test_year_after_current_year_rejected() {
        let mut book = dune();
        book.year = Utc::now().year() + 1;
        assert_eq!(fields(&book.validate()), vec!["year"]);
    }

    #[test]
    fn test_runtime_must_be_positive() {
        let mut book = dune();
        book.runtime = Runtime(-5);
        let errors = book.validate();
        assert_eq!(errors[0].field, "runtime");
        assert_eq!(errors[0].message, "must be a positive integer");
    }

    #[test]
    fn test_genre_rules() {
        let mut book = dune();
        book.genres = vec!["scifi".into(), "scifi".into()];
        assert_eq!(book.validate()[0].message, "must not contain duplicate values");

        book.genres = (0..6).map(|i| format!("g{}", i)).collect();
        assert_eq!(book.validate()[0].message, "must not contain more than 5 genres");

        book.genres = vec![];
        assert_eq!(book.validate()[0].message, "must contain at least 1 genre");

        book.genres = (0..5).map(|i| format!("g{}", i)).collect();
        assert!(book.validate().is_empty());
    }

    #[test]
    fn test_pages_bounds() {
        let mut book = dune();
        book.pages = 10_000;
        assert!(book.validate().is_empty());
        book.pages = 0;
        assert!(book.validate().is_empty());
        book.pages = -1;
        assert_eq!(book.validate()[0].message, "must not be negative");
    }

    #[test]
    fn test_same_genres_ignores_order() {
        let mut a = dune();
        let mut b = dune();
        a.genres = vec!["drama".into(), "scifi".into()];
        b.genres = vec!["scifi".into(), "drama".into()];
        assert!(a.same_genres(&b));
        b.genres.pop();
        assert!(!a.same_genres(&b));
    }

    #[test]
    fn test_runtime_json_format() {
        let json = serde_json::to_string(&Runtime(102)).unwrap();
        assert_eq!(json, "\"102 mins\"");

        let parsed: Runtime = serde_json::from_str("\"95 mins\"").unwrap();
        assert_eq!(parsed, Runtime(95));

        assert!(serde_json::from_str::<Runtime>("\"95 minutes\"").is_err());
        assert!(serde_json::from_str::<Runtime>("95").is_err());
    }

    #[test]
    fn test_book_json_hides_created_at() {
        let json = serde_json::to_value(dune()).unwrap();
        assert!(json.get("created_at").is_none());
        assert_eq!(json["runtime"], "1 mins");
        assert_eq!(json["genres"][0], "scifi");
    }

    #[test]
    fn test_new_book_missing_genres() {
        let input = NewBook {
            title: "Dune".into(),
            year: 1965,
            runtime: Runtime(1),
            ..Default::default()
        };
        let errors = input.into_book().unwrap_err();
        assert_eq!(errors.get("genres"), Some("must be provided"));
    }

    #[test]
    fn test_new_book_into_book() {
        let input = NewBook {
            title: "Dune".into(),
            sales: 100,
            pages: 412,
            year: 1965,
            runtime: Runtime(1),
            genres: Some(vec!["scifi".into()]),
        };
        let book = input.into_book().unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.pages, 412);
        assert_eq!(book.id, 0);
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut book = dune();
        let patch = BookPatch {
            title: Some("Dune Messiah".into()),
            pages: Some(256),
            ..Default::default()
        };
        patch.apply_to(&mut book);

        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.pages, 256);
        assert_eq!(book.sales, 100);
        assert_eq!(book.year, 1965);
        assert!(!patch.is_empty());
        assert!(BookPatch::default().is_empty());
    }

    #[test]
    fn test_patch_from_json() {
        let patch: BookPatch =
            serde_json::from_str(r#"{"runtime":"12 mins","genres":["a","b"]}"#).unwrap();
        assert_eq!(patch.runtime, Some(Runtime(12)));
        assert_eq!(patch.genres, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(patch.title.is_none());
    }
}
