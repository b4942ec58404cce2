//! Pagination and sort primitives
//!
//! The API boundary is 1-indexed; internally everything is an offset.
//! Omitted page/perPage default to page 1 with 50 per page, clamped to a
//! maximum of 100 per page.

use serde::{Deserialize, Serialize};

/// Default number of results per page
pub const DEFAULT_PER_PAGE: u64 = 50;
/// Upper bound on results per page
pub const MAX_PER_PAGE: u64 = 100;

/// Offset-based pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// Build a window from 1-indexed wire parameters
    pub fn from_page(page: Option<u64>, per_page: Option<u64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        Self {
            offset: (page - 1) * limit,
            limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::from_page(None, None)
    }
}

/// Sort order for range queries. Without a caller-supplied sort, versions
/// are ordered by creation time ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub key: String,
    pub reverted: bool,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            key: "createdAt".to_string(),
            reverted: false,
        }
    }
}

/// One page of results together with the unpaginated total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}
