//! Notification service. Notifications have no relations and an empty
//! listing is a normal answer here.

use std::sync::Arc;

use forum_core::ports::NotificationStorage;
use forum_core::validation::validate_pagination;
use forum_core::{EntityId, ForumError, ForumResult, Notification, NotificationAdd, Pagination, Session};
use tracing::debug;

use crate::config::ForumConfig;

pub struct NotificationService {
    storage: Arc<dyn NotificationStorage>,
    config: Arc<ForumConfig>,
}

impl NotificationService {
    pub fn new(storage: Arc<dyn NotificationStorage>, config: Arc<ForumConfig>) -> Self {
        NotificationService { storage, config }
    }

    pub async fn add(&self, sess: &Session, notification: NotificationAdd) -> ForumResult<EntityId> {
        if notification.text.trim().is_empty() {
            return Err(ForumError::validation("Notification text must not be empty"));
        }
        let id = self.storage.insert(sess, &notification).await?;
        debug!(session_id = %sess.id, user_id = notification.user_id, notification_id = id, "Notification queued");
        Ok(id)
    }

    /// Removes every notification of `user_id`.
    pub async fn clear(&self, sess: &Session, user_id: EntityId) -> ForumResult<u64> {
        self.storage.delete_by_user(sess, user_id).await
    }

    /// Newest first.
    pub async fn all(
        &self,
        sess: &Session,
        user_id: EntityId,
        pagination: Option<Pagination>,
    ) -> ForumResult<Vec<Notification>> {
        let pagination = self.config.pagination_or_default(pagination);
        validate_pagination(&pagination, self.config.max_page_limit)?;

        self.storage.select_by_user(sess, user_id, pagination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::usecase::test_support::register;
    use forum_core::ErrorKind;

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let forum = testing::forum().await;
        let id = register(&forum, "alice").await;

        let err = forum
            .notifications()
            .service()
            .add(&Session::new(), NotificationAdd::new(id, "   "))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_empty_inbox_is_not_an_error() {
        let forum = testing::forum().await;
        let id = register(&forum, "alice").await;

        let service = forum.notifications().service();

        let inbox = service.all(&Session::new(), id, None).await.unwrap();
        assert!(inbox.is_empty());
        assert_eq!(service.clear(&Session::new(), id).await.unwrap(), 0);
    }
}
