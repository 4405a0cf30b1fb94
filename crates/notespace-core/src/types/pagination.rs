//! Pagination envelope for list operations.

use serde::{Deserialize, Serialize};

/// Offset/limit paginated response wrapper.
///
/// `total` counts all items matching the query, not just the returned page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of matching items across all pages.
    pub total: usize,
    /// Offset that produced this page.
    pub offset: usize,
    /// Limit that produced this page.
    pub limit: usize,
}

impl<T> Page<T> {
    /// Slice `items` into a page after the caller has filtered and sorted.
    pub fn slice(items: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = items.len();
        let page = items.into_iter().skip(offset).take(limit).collect();
        Self {
            items: page,
            total,
            offset,
            limit,
        }
    }
}
