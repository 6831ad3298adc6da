//! # Domain Types
//!
//! Entities, inputs and listing options for the forum.
//!
//! ## Entity Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Section ──< Topic ──< Post                                           │
//! │                 │         │                                             │
//! │                 └── User ─┘──< Notification                            │
//! │                                                                         │
//! │   ──<  "owns many"                                                     │
//! │                                                                         │
//! │   Embedded relations (user.topics, topic.section, post.user, ...)      │
//! │   are transient: filled per request, never written back.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

pub mod notification;
pub mod post;
pub mod section;
pub mod topic;
pub mod user;

pub use notification::*;
pub use post::*;
pub use section::*;
pub use topic::*;
pub use user::*;

/// Storage-assigned, monotonic entity identifier.
pub type EntityId = i64;

// =============================================================================
// Pagination
// =============================================================================

/// Page-based pagination. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub page: i64,
}

impl Pagination {
    pub fn new(limit: i64, page: i64) -> Self {
        Pagination { limit, page }
    }

    /// Number of rows to skip. Saturates instead of overflowing.
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.limit.max(0))
    }
}

// =============================================================================
// Sort Order
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Sort key and direction for a listing.
///
/// `K` is the per-entity key enum ([`UserSortBy`], [`TopicSortBy`], ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort<K> {
    pub by: K,
    pub order: SortOrder,
}

impl<K> Sort<K> {
    pub fn new(by: K, order: SortOrder) -> Self {
        Sort { by, order }
    }
}

/// Maps a sort key to the column it orders by.
pub trait SortKey: Copy {
    /// Key used when the caller supplies no sort.
    const CREATED_AT: Self;

    fn column(self) -> &'static str;
}

// =============================================================================
// Helpers
// =============================================================================

/// Collects unique ids in first-seen order.
pub fn unique_ids(ids: impl IntoIterator<Item = EntityId>) -> Vec<EntityId> {
    let mut out: Vec<EntityId> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(20, 1).offset(), 0);
        assert_eq!(Pagination::new(20, 3).offset(), 40);
        assert_eq!(Pagination::new(20, 0).offset(), 0);
        assert_eq!(Pagination::new(20, i64::MAX).offset(), i64::MAX);
    }

    #[test]
    fn test_unique_ids_keeps_order() {
        assert_eq!(unique_ids([3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
