//! Listing filters: text query, genre containment, numeric ranges, pagination
//! and safelisted sorting.
//!
//! Sorting is never built from caller text. A requested sort value must appear
//! in the caller's safelist and is then resolved to a [`SortOrder`], a pair of
//! enums whose SQL rendering is fixed at compile time.

use crate::validation::{permitted_value, FieldError, ValidationErrors, Validator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest accepted page number.
pub const MAX_PAGE: i64 = 10_000_000;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: i64 = 100;
/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Sort values callers may request when listing books.
pub const DEFAULT_SORT_SAFELIST: &[&str] = &[
    "id", "title", "sales", "pages", "year", "runtime", "-id", "-title", "-sales", "-pages",
    "-year", "-runtime",
];

/// Sortable book columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortColumn {
    Id,
    Title,
    Sales,
    Pages,
    Year,
    Runtime,
}

impl SortColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::Id => "b.id",
            SortColumn::Title => "b.title",
            SortColumn::Sales => "b.sales",
            SortColumn::Pages => "b.pages",
            SortColumn::Year => "b.year",
            SortColumn::Runtime => "b.runtime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A resolved, injection-safe ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortOrder {
    /// ORDER BY body, always tie-broken on ascending id.
    pub fn order_by_sql(&self) -> String {
        match self.column {
            SortColumn::Id => format!("b.id {}", self.direction.as_sql()),
            column => format!("{} {}, b.id ASC", column.as_sql(), self.direction.as_sql()),
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: SortColumn::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = FieldError;

    /// Parse `"year"` / `"-year"` style values.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (direction, name) = match value.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, value),
        };

        let column = match name {
            "id" => SortColumn::Id,
            "title" => SortColumn::Title,
            "sales" => SortColumn::Sales,
            "pages" => SortColumn::Pages,
            "year" => SortColumn::Year,
            "runtime" => SortColumn::Runtime,
            _ => return Err(FieldError::new("sort", "invalid sort value")),
        };

        Ok(Self { column, direction })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.column {
            SortColumn::Id => "id",
            SortColumn::Title => "title",
            SortColumn::Sales => "sales",
            SortColumn::Pages => "pages",
            SortColumn::Year => "year",
            SortColumn::Runtime => "runtime",
        };
        match self.direction {
            SortDirection::Asc => f.write_str(name),
            SortDirection::Desc => write!(f, "-{}", name),
        }
    }
}

pub fn validate_page(page: i64) -> Result<(), FieldError> {
    if page <= 0 {
        return Err(FieldError::new("page", "must be greater than zero"));
    }
    if page > MAX_PAGE {
        return Err(FieldError::new("page", "must be a maximum of 10 million"));
    }
    Ok(())
}

pub fn validate_page_size(page_size: i64) -> Result<(), FieldError> {
    if page_size <= 0 {
        return Err(FieldError::new("page_size", "must be greater than zero"));
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(FieldError::new("page_size", "must be a maximum of 100"));
    }
    Ok(())
}

/// Reject any sort value the caller did not safelist.
pub fn validate_sort<S: AsRef<str>>(sort: &str, safelist: &[S]) -> Result<(), FieldError> {
    let safelist: Vec<&str> = safelist.iter().map(AsRef::as_ref).collect();
    if permitted_value(&sort, &safelist) {
        Ok(())
    } else {
        Err(FieldError::new("sort", "invalid sort value"))
    }
}

/// Pagination and sorting parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safelist: Vec<String>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: "id".to_string(),
            sort_safelist: DEFAULT_SORT_SAFELIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Filters {
    pub fn new(page: i64, page_size: i64, sort: impl Into<String>) -> Self {
        Self {
            page,
            page_size,
            sort: sort.into(),
            ..Self::default()
        }
    }

    pub fn with_safelist<I, S>(mut self, safelist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_safelist = safelist.into_iter().map(Into::into).collect();
        self
    }

    /// Record every pagination/sort violation into `v`.
    pub fn check(&self, v: &mut Validator) {
        for result in [
            validate_page(self.page),
            validate_page_size(self.page_size),
            validate_sort(&self.sort, &self.sort_safelist),
        ] {
            if let Err(e) = result {
                v.add_error(&e.field, &e.message);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish()
    }

    /// Resolve the requested sort through the safelist.
    pub fn sort_order(&self) -> Result<SortOrder, FieldError> {
        validate_sort(&self.sort, &self.sort_safelist)?;
        self.sort.parse()
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// Everything `list` accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFilter {
    /// Free-text title query; empty means no text filter.
    pub title: String,
    /// Required genres; a row matches when it carries all of them.
    pub genres: Vec<String>,
    pub min_sales: Option<i32>,
    pub max_sales: Option<i32>,
    pub min_pages: Option<i32>,
    pub max_pages: Option<i32>,
    pub filters: Filters,
}

impl BookFilter {
    pub fn new(filters: Filters) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sales_range(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.min_sales = min;
        self.max_sales = max;
        self
    }

    pub fn with_pages_range(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.min_pages = min;
        self.max_pages = max;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        self.filters.check(&mut v);
        check_range(&mut v, "sales", self.min_sales, self.max_sales);
        check_range(&mut v, "pages", self.min_pages, self.max_pages);
        v.finish()
    }

    /// How the title query constrains the result set.
    ///
    /// Each whitespace-separated term with at least one alphanumeric character
    /// becomes a quoted FTS5 phrase; phrases are implicitly AND-ed. Only an
    /// empty title leaves rows unfiltered; a title with no searchable terms
    /// matches nothing.
    pub fn text_match(&self) -> TextMatch {
        if self.title.is_empty() {
            return TextMatch::Any;
        }

        let terms: Vec<String> = self
            .title
            .split_whitespace()
            .filter(|term| term.chars().any(char::is_alphanumeric))
            .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
            .collect();

        if terms.is_empty() {
            TextMatch::Nothing
        } else {
            TextMatch::Expression(terms.join(" "))
        }
    }
}

/// Resolved title query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// No text filter
    Any,
    /// FTS5 match expression
    Expression(String),
    /// The query has no searchable terms; no row matches
    Nothing,
}

fn check_range(v: &mut Validator, field: &str, min: Option<i32>, max: Option<i32>) {
    v.check(min.map_or(true, |m| m >= 0), field, "minimum must not be negative");
    v.check(max.map_or(true, |m| m >= 0), field, "maximum must not be negative");
    if let (Some(min), Some(max)) = (min, max) {
        v.check(min <= max, field, "minimum must not exceed maximum");
    }
}
