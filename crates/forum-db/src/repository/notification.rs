//! # Notification Repository
//!
//! Notifications are append-only. Clearing removes rows for good.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_core::ports::{NotificationStorage, Transactioner};
use forum_core::{
    EntityId, ForumResult, Notification, NotificationAdd, Pagination, Session, Transaction,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::tx::{self, Conn};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    pub async fn create(&self, sess: &Session, notification: &NotificationAdd) -> DbResult<EntityId> {
        debug!(session_id = %sess.id, user_id = notification.user_id, "Inserting notification");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let id = sqlx::query(
            "INSERT INTO notifications (user_id, text, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(notification.user_id)
        .bind(&notification.text)
        .bind(Utc::now())
        .execute(conn.get()?)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn clear(&self, sess: &Session, user_id: EntityId) -> DbResult<u64> {
        debug!(session_id = %sess.id, user_id, "Clearing notifications");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = ?1")
            .bind(user_id)
            .execute(conn.get()?)
            .await?;

        Ok(result.rows_affected())
    }

    /// Newest first, ties broken by id.
    pub async fn list_for_user(
        &self,
        sess: &Session,
        user_id: EntityId,
        pagination: Pagination,
    ) -> DbResult<Vec<Notification>> {
        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, text, created_at
            FROM notifications
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(user_id)
        .bind(pagination.limit)
        .bind(pagination.offset())
        .fetch_all(conn.get()?)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }
}

// =============================================================================
// Storage Port
// =============================================================================

#[async_trait]
impl Transactioner for NotificationRepository {
    async fn begin(&self, _sess: &Session) -> ForumResult<Box<dyn Transaction>> {
        tx::begin(&self.pool).await
    }
}

#[async_trait]
impl NotificationStorage for NotificationRepository {
    async fn insert(
        &self,
        sess: &Session,
        notification: &NotificationAdd,
    ) -> ForumResult<EntityId> {
        Ok(self.create(sess, notification).await?)
    }

    async fn delete_by_user(&self, sess: &Session, user_id: EntityId) -> ForumResult<u64> {
        Ok(self.clear(sess, user_id).await?)
    }

    async fn select_by_user(
        &self,
        sess: &Session,
        user_id: EntityId,
        pagination: Pagination,
    ) -> ForumResult<Vec<Notification>> {
        Ok(self.list_for_user(sess, user_id, pagination).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{database, insert_user, session};

    #[tokio::test]
    async fn test_newest_first_and_clear() {
        let db = database().await;
        let repo = db.notifications();
        let sess = session();
        let alice = insert_user(db.pool(), "alice").await;
        let bob = insert_user(db.pool(), "bob").await;

        repo.create(&sess, &NotificationAdd::new(alice, "first")).await.unwrap();
        repo.create(&sess, &NotificationAdd::new(alice, "second")).await.unwrap();
        repo.create(&sess, &NotificationAdd::new(bob, "for bob")).await.unwrap();

        let mine = repo
            .list_for_user(&sess, alice, Pagination::new(20, 1))
            .await
            .unwrap();
        let texts: Vec<_> = mine.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);

        assert_eq!(repo.clear(&sess, alice).await.unwrap(), 2);
        assert!(repo
            .list_for_user(&sess, alice, Pagination::new(20, 1))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.list_for_user(&sess, bob, Pagination::new(20, 1))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_pagination() {
        let db = database().await;
        let repo = db.notifications();
        let sess = session();
        let alice = insert_user(db.pool(), "alice").await;

        for i in 0..5 {
            repo.create(&sess, &NotificationAdd::new(alice, format!("n{i}")))
                .await
                .unwrap();
        }

        let page = repo
            .list_for_user(&sess, alice, Pagination::new(2, 3))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].text, "n0");
    }
}
