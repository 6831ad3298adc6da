//! # Storage Ports
//!
//! What the orchestration layer needs from persistence, one trait per
//! entity, plus the credential primitive.
//!
//! ## Transaction Participation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  port.insert(&sess, ...)                                                │
//! │       │                                                                 │
//! │       ├── sess.transaction() is Some ──► run on that transaction       │
//! │       └── None ──────────────────────► run on a pooled connection      │
//! │                                                                         │
//! │  port.begin(&sess) ──► Box<dyn Transaction> (installed by the caller)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `select_by_id` fails with a NotFound error when the row is absent
//! or soft-deleted. `select_all` returns an empty vector on no match; the
//! services decide what "empty" means.

use async_trait::async_trait;

use crate::error::ForumResult;
use crate::session::{Session, Transaction};
use crate::types::*;

/// Opens a new storage transaction.
#[async_trait]
pub trait Transactioner: Send + Sync {
    async fn begin(&self, sess: &Session) -> ForumResult<Box<dyn Transaction>>;
}

/// A user together with the stored password digest.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStorage: Transactioner {
    /// Inserts the user and its secondary info row.
    ///
    /// `user.password` must already be a digest.
    async fn insert(&self, sess: &Session, user: &UserAdd) -> ForumResult<EntityId>;

    /// Sparse update. `edit.password`, when present, must be a digest.
    async fn update(&self, sess: &Session, edit: &UserEdit) -> ForumResult<()>;

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()>;

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<User>;

    async fn select_by_nickname(
        &self,
        sess: &Session,
        nickname: &str,
    ) -> ForumResult<Option<UserCredentials>>;

    async fn select_all(
        &self,
        sess: &Session,
        filters: &UserFilters,
        pagination: Pagination,
        sort: UserSort,
    ) -> ForumResult<Vec<User>>;

    /// Secondary info for the given users, keyed by user id.
    async fn select_info(
        &self,
        sess: &Session,
        ids: &[EntityId],
    ) -> ForumResult<Vec<(EntityId, UserInfo)>>;
}

#[async_trait]
pub trait SectionStorage: Transactioner {
    async fn insert(&self, sess: &Session, section: &SectionAdd) -> ForumResult<EntityId>;

    async fn update(&self, sess: &Session, edit: &SectionEdit) -> ForumResult<()>;

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()>;

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Section>;

    async fn select_all(
        &self,
        sess: &Session,
        filters: &SectionFilters,
        pagination: Pagination,
        sort: SectionSort,
    ) -> ForumResult<Vec<Section>>;
}

#[async_trait]
pub trait TopicStorage: Transactioner {
    async fn insert(&self, sess: &Session, topic: &TopicAdd) -> ForumResult<EntityId>;

    async fn update(&self, sess: &Session, edit: &TopicEdit) -> ForumResult<()>;

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()>;

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Topic>;

    async fn select_all(
        &self,
        sess: &Session,
        filters: &TopicFilters,
        pagination: Pagination,
        sort: TopicSort,
    ) -> ForumResult<Vec<Topic>>;

    /// Resolves a mass-delete filter into concrete live ids.
    async fn ids_to_delete(&self, sess: &Session, filter: &TopicDelete)
        -> ForumResult<Vec<EntityId>>;
}

#[async_trait]
pub trait PostStorage: Transactioner {
    async fn insert(&self, sess: &Session, post: &PostAdd) -> ForumResult<EntityId>;

    async fn update(&self, sess: &Session, edit: &PostEdit) -> ForumResult<()>;

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()>;

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Post>;

    async fn select_all(
        &self,
        sess: &Session,
        filters: &PostFilters,
        pagination: Pagination,
        sort: PostSort,
    ) -> ForumResult<Vec<Post>>;

    /// Resolves a mass-delete filter into concrete live ids.
    async fn ids_to_delete(&self, sess: &Session, filter: &PostDelete) -> ForumResult<Vec<EntityId>>;
}

#[async_trait]
pub trait NotificationStorage: Transactioner {
    async fn insert(&self, sess: &Session, notification: &NotificationAdd)
        -> ForumResult<EntityId>;

    /// Deletes every notification of `user_id`, returning how many were removed.
    async fn delete_by_user(&self, sess: &Session, user_id: EntityId) -> ForumResult<u64>;

    /// Newest first.
    async fn select_by_user(
        &self,
        sess: &Session,
        user_id: EntityId,
        pagination: Pagination,
    ) -> ForumResult<Vec<Notification>>;
}

/// Opaque password hashing primitive.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> ForumResult<String>;

    /// Returns false on mismatch or on a malformed digest.
    fn verify(&self, digest: &str, password: &str) -> bool;
}
