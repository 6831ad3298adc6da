//! # Use-Cases
//!
//! The operation surface a transport calls into. Use-cases own authorization
//! and the side effects that must not share the mutating transaction.
//!
//! ## Lifecycle of a Mutation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  authorize (policy) ── fails before any storage call                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  do_transaction ─► check refs ─► mutate ─► cascade ─► read back        │
//! │       │                                                                 │
//! │       ▼ commit                                                          │
//! │  notify (outer session, best-effort: failures are logged and dropped)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  result, or error stamped with session id and caller id                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod notification;
pub mod post;
pub mod section;
pub mod topic;
pub mod user;

pub use notification::NotificationUseCase;
pub use post::PostUseCase;
pub use section::SectionUseCase;
pub use topic::TopicUseCase;
pub use user::UserUseCase;

use std::future::Future;
use std::sync::Arc;

use forum_core::{EntityId, ForumError, ForumResult, NotificationAdd, Session};
use tracing::warn;

use crate::service::NotificationService;

/// Runs `op` and stamps any error with the session's context.
pub(crate) async fn enriched<T>(
    sess: &Session,
    op: impl Future<Output = ForumResult<T>>,
) -> ForumResult<T> {
    op.await.map_err(|err| sess.enrich(err))
}

/// The single row of a by-id listing.
pub(crate) fn single<T>(rows: Vec<T>, entity: &str, id: EntityId) -> ForumResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ForumError::not_found(format!("{} with ID {} not found", entity, id)))
}

// =============================================================================
// Notifier
// =============================================================================

/// Post-commit, best-effort notification dispatch.
#[derive(Clone)]
pub(crate) struct Notifier {
    notifications: Arc<NotificationService>,
}

impl Notifier {
    pub(crate) fn new(notifications: Arc<NotificationService>) -> Self {
        Notifier { notifications }
    }

    /// Never fails. Runs outside any transaction.
    pub(crate) async fn send(&self, sess: &Session, user_id: EntityId, text: String) {
        let outer = sess.detached();
        let notification = NotificationAdd::new(user_id, text);

        if let Err(err) = self.notifications.add(&outer, notification).await {
            warn!(
                session_id = %sess.id,
                user_id,
                error = %err,
                "Failed to deliver notification"
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use forum_core::{
        EntityId, RequestedFields, Session, UserAdd, UserEdit, UserLevel, UserRestriction,
    };

    use crate::forum::Forum;
    use crate::testing::PASSWORD;

    /// Registers a user directly through the service.
    pub(crate) async fn register(forum: &Forum, nickname: &str) -> EntityId {
        forum
            .user_service
            .add(
                &Session::new(),
                UserAdd {
                    nickname: nickname.to_string(),
                    password: PASSWORD.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    pub(crate) async fn login(forum: &Forum, nickname: &str) -> Session {
        forum
            .users()
            .authenticate(&Session::new(), nickname, PASSWORD)
            .await
            .unwrap()
    }

    pub(crate) async fn member(forum: &Forum, nickname: &str) -> Session {
        register(forum, nickname).await;
        login(forum, nickname).await
    }

    /// Registers a user with the given level and restriction, then logs in.
    pub(crate) async fn privileged(
        forum: &Forum,
        nickname: &str,
        level: UserLevel,
        restriction: UserRestriction,
    ) -> Session {
        let id = register(forum, nickname).await;
        forum
            .user_service
            .edit(
                &Session::new(),
                UserEdit {
                    level: Some(level),
                    restriction: Some(restriction),
                    ..UserEdit::new(id)
                },
            )
            .await
            .unwrap();

        login(forum, nickname).await
    }

    pub(crate) async fn admin(forum: &Forum) -> Session {
        privileged(forum, "admin", UserLevel::Admin, UserRestriction::None).await
    }

    pub(crate) async fn moderator(forum: &Forum) -> Session {
        privileged(forum, "moderator", UserLevel::Mod, UserRestriction::None).await
    }

    pub(crate) fn with_fields(sess: &Session, paths: &[&str]) -> Session {
        sess.clone()
            .with_requested_fields(RequestedFields::from_paths(paths.iter().copied()))
    }

    pub(crate) async fn notification_texts(forum: &Forum, user_id: EntityId) -> Vec<String> {
        forum
            .notifications()
            .service()
            .all(&Session::new(), user_id, None)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.text)
            .collect()
    }
}
