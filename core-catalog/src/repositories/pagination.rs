//! Pagination metadata for list responses

use serde::{Deserialize, Serialize};

/// Summary of where a page sits within the full result set.
///
/// All fields are zero when the filter matched nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Metadata {
    /// Check if there are more pages after the current one
    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    /// Check if there are pages before the current one
    pub fn has_previous(&self) -> bool {
        self.current_page > self.first_page
    }

    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

/// Build metadata from a total record count and the requested page.
///
/// # Examples
///
/// ```
/// use core_catalog::repositories::calculate_metadata;
///
/// let metadata = calculate_metadata(25, 1, 20);
/// assert_eq!(metadata.last_page, 2);
/// assert_eq!(metadata.total_records, 25);
/// ```
pub fn calculate_metadata(total_records: i64, page: i64, page_size: i64) -> Metadata {
    if total_records <= 0 || page_size <= 0 {
        return Metadata::default();
    }

    Metadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: (total_records + page_size - 1) / page_size,
        total_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_all_zero() {
        assert_eq!(calculate_metadata(0, 1, 20), Metadata::default());
        assert_eq!(calculate_metadata(0, 7, 5), Metadata::default());
        assert!(calculate_metadata(0, 1, 20).is_empty());
    }

    #[test]
    fn test_partial_last_page() {
        let metadata = calculate_metadata(25, 1, 20);
        assert_eq!(
            metadata,
            Metadata {
                current_page: 1,
                page_size: 20,
                first_page: 1,
                last_page: 2,
                total_records: 25,
            }
        );
        assert!(metadata.has_next());
        assert!(!metadata.has_previous());
    }

    #[test]
    fn test_exact_multiple() {
        let metadata = calculate_metadata(40, 2, 20);
        assert_eq!(metadata.last_page, 2);
        assert!(!metadata.has_next());
        assert!(metadata.has_previous());
    }

    #[test]
    fn test_page_beyond_last_is_reported_as_requested() {
        let metadata = calculate_metadata(3, 9, 2);
        assert_eq!(metadata.current_page, 9);
        assert_eq!(metadata.last_page, 2);
        assert!(!metadata.has_next());
    }

    #[test]
    fn test_empty_metadata_serializes_to_empty_object() {
        let json = serde_json::to_string(&Metadata::default()).unwrap();
        assert_eq!(json, "{}");

        let json = serde_json::to_value(calculate_metadata(1, 1, 20)).unwrap();
        assert_eq!(json["last_page"], 1);
    }
}
