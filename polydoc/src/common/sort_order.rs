use crate::common::DESCENDING_PREFIX;

/// Specifies the direction for sorting records.
///
/// Used by [crate::store::FindOptions] to control result ordering. The string
/// form accepted by [SortOrder::parse] follows the document-store convention: a
/// leading `-` means descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z, oldest to newest)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A, newest to oldest)
    Descending,
}

impl SortOrder {
    /// Splits a sort key like `"-stuff.foo"` into its field path and direction.
    pub fn parse(sort_key: &str) -> (String, SortOrder) {
        match sort_key.strip_prefix(DESCENDING_PREFIX) {
            Some(field) => (field.to_string(), SortOrder::Descending),
            None => (sort_key.to_string(), SortOrder::Ascending),
        }
    }

    /// Native document-store direction: `1` or `-1`.
    pub fn as_direction(&self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}
