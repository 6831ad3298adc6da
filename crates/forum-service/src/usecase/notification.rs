//! Notification use-case. Callers only ever see and clear their own inbox.

use std::sync::Arc;

use forum_core::policy::require_authorized;
use forum_core::{ForumResult, Notification, Pagination, Session};

use super::enriched;
use crate::service::NotificationService;

pub struct NotificationUseCase {
    notifications: Arc<NotificationService>,
}

impl NotificationUseCase {
    pub(crate) fn new(notifications: Arc<NotificationService>) -> Self {
        NotificationUseCase { notifications }
    }

    #[cfg(test)]
    pub(crate) fn service(&self) -> &NotificationService {
        &self.notifications
    }

    /// Deletes every notification of the caller.
    pub async fn clear(&self, sess: &Session) -> ForumResult<()> {
        enriched(sess, async {
            require_authorized(sess)?;
            self.notifications.clear(sess, sess.user_id).await.map(|_| ())
        })
        .await
    }

    /// The caller's notifications, newest first.
    pub async fn all(
        &self,
        sess: &Session,
        pagination: Option<Pagination>,
    ) -> ForumResult<Vec<Notification>> {
        enriched(sess, async {
            require_authorized(sess)?;
            self.notifications.all(sess, sess.user_id, pagination).await
        })
        .await
    }
}
