//! # Entity Services
//!
//! One service per entity. A service owns the transaction boundary for its
//! operations, checks references, cascades deletes and embeds the relations
//! the session's field tree asks for.
//!
//! ## Anatomy of `all`
//! ```text
//! all(sess, filters, pagination?, sort?)
//!   │
//!   ├── defaults from ForumConfig, validate
//!   └── do_transaction
//!         ├── storage.select_all ──► rows (empty ──► NotFound)
//!         ├── id ──► row lookup
//!         └── for each requested relation key present in the tree:
//!               sibling.related(sess narrowed to key, ids) ── one batch
//!               attach through the lookup
//! ```

pub mod notification;
pub mod post;
pub mod section;
pub mod topic;
pub mod user;

pub use notification::NotificationService;
pub use post::PostService;
pub use section::SectionService;
pub use topic::TopicService;
pub use user::UserService;

use std::collections::HashMap;

use forum_core::{EntityId, ErrorKind, ForumError, ForumResult};

/// Rewrites a NotFound from a by-id lookup into "`entity` with ID `id` not found".
pub(crate) fn missing_reference(err: ForumError, entity: &str, id: EntityId) -> ForumError {
    if err.is(ErrorKind::NotFound) {
        ForumError::not_found(format!("{} with ID {} not found", entity, id))
    } else {
        err
    }
}

/// An empty listing is reported as NotFound.
pub(crate) fn non_empty<T>(rows: Vec<T>, message: &str) -> ForumResult<Vec<T>> {
    if rows.is_empty() {
        Err(ForumError::not_found(message))
    } else {
        Ok(rows)
    }
}

/// Row position by id, for attaching batched relations.
pub(crate) fn positions<T>(rows: &[T], id: impl Fn(&T) -> EntityId) -> HashMap<EntityId, usize> {
    rows.iter().enumerate().map(|(i, row)| (id(row), i)).collect()
}

/// Related rows by id, for one-to-one attachments.
pub(crate) fn by_id<T>(rows: Vec<T>, id: impl Fn(&T) -> EntityId) -> HashMap<EntityId, T> {
    rows.into_iter().map(|row| (id(&row), row)).collect()
}
