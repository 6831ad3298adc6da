//! # Cross-Service Adapters
//!
//! Services never name each other's concrete types. Each one reaches its
//! siblings through the narrow traits below, held as non-owning references
//! that the composition root wires once after every service exists.
//!
//! ## Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Forum (owns Arc<XService> for every entity)                           │
//! │                                                                         │
//! │   UserService ─────► TopicAdapter, PostAdapter                          │
//! │   SectionService ──► TopicAdapter                                       │
//! │   TopicService ────► UserAdapter, SectionAdapter, PostAdapter           │
//! │   PostService ─────► UserAdapter, TopicAdapter                          │
//! │                                                                         │
//! │   arrows are Weak: the cycle User ↔ Topic ↔ Post never owns itself     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `related` is the embedding fetch: every row matching the filter, with the
//! relations the (already narrowed) session asks for, and an empty result is
//! not an error.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use forum_core::{
    EntityId, ForumError, ForumResult, Pagination, PlainTopicById, Post, PostDelete, PostFilters,
    Section, SectionFilters, Session, Topic, TopicDelete, TopicFilters, User, UserFilters,
};

/// Pagination for embedding fetches: the whole matching set.
pub(crate) const EVERYTHING: Pagination = Pagination {
    limit: i64::MAX,
    page: 1,
};

#[async_trait]
pub trait UserAdapter: Send + Sync {
    async fn related(&self, sess: &Session, filters: UserFilters) -> ForumResult<Vec<User>>;

    async fn plain_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<User>;

    async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()>;
}

#[async_trait]
pub trait SectionAdapter: Send + Sync {
    async fn related(&self, sess: &Session, filters: SectionFilters) -> ForumResult<Vec<Section>>;

    async fn plain_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Section>;

    async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()>;
}

#[async_trait]
pub trait TopicAdapter: Send + Sync {
    async fn related(&self, sess: &Session, filters: TopicFilters) -> ForumResult<Vec<Topic>>;

    async fn plain_by_id(&self, sess: &Session, query: PlainTopicById) -> ForumResult<Topic>;

    async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()>;

    /// Deletes the matching topics and, through the post adapter, their posts.
    async fn mass_delete(&self, sess: &Session, filter: &TopicDelete) -> ForumResult<()>;
}

#[async_trait]
pub trait PostAdapter: Send + Sync {
    async fn related(&self, sess: &Session, filters: PostFilters) -> ForumResult<Vec<Post>>;

    async fn mass_delete(&self, sess: &Session, filter: &PostDelete) -> ForumResult<()>;
}

// =============================================================================
// Sibling Reference
// =============================================================================

/// A sibling adapter, attached once after construction.
pub(crate) struct Sibling<T: ?Sized> {
    name: &'static str,
    slot: OnceLock<Weak<T>>,
}

impl<T: ?Sized> Sibling<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        Sibling {
            name,
            slot: OnceLock::new(),
        }
    }

    /// Later calls are ignored; wiring is read-only once set.
    pub(crate) fn attach(&self, target: Weak<T>) {
        let _ = self.slot.set(target);
    }

    pub(crate) fn get(&self) -> ForumResult<Arc<T>> {
        self.slot
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ForumError::internal(format!("{} adapter is not attached", self.name)))
    }
}

impl<T: ?Sized> fmt::Debug for Sibling<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sibling")
            .field("name", &self.name)
            .field("attached", &self.slot.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::ErrorKind;

    trait Greeter: Send + Sync {
        fn hello(&self) -> &'static str;
    }

    struct English;

    impl Greeter for English {
        fn hello(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_unattached_sibling_is_internal_error() {
        let sibling: Sibling<dyn Greeter> = Sibling::new("Greeter");

        let err = sibling.get().err().unwrap();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "Greeter adapter is not attached");
    }

    #[test]
    fn test_sibling_does_not_keep_target_alive() {
        let sibling: Sibling<dyn Greeter> = Sibling::new("Greeter");
        let target: Arc<dyn Greeter> = Arc::new(English);
        sibling.attach(Arc::downgrade(&target));

        assert_eq!(sibling.get().unwrap().hello(), "hello");

        drop(target);
        assert!(sibling.get().is_err());
    }
}
