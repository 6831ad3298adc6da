//! # Topic Repository
//!
//! `count_posts` is derived from live posts on every read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_core::ports::{TopicStorage, Transactioner};
use forum_core::{
    EntityId, ForumResult, Pagination, Session, Topic, TopicAdd, TopicDelete, TopicEdit,
    TopicFilters, TopicSort, Transaction,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::query::{push_id_list, push_page, push_set, Conditions};
use crate::tx::{self, Conn};

const TOPIC_SELECT: &str = r#"
    SELECT t.id, t.section_id, t.user_id, t.name, t.created_at, t.updated_at,
           (SELECT COUNT(*) FROM posts p
             WHERE p.topic_id = t.id AND p.deleted_at IS NULL) AS count_posts
    FROM topics t
    WHERE t.deleted_at IS NULL"#;

#[derive(Debug, sqlx::FromRow)]
struct TopicRow {
    id: i64,
    section_id: i64,
    user_id: i64,
    name: String,
    count_posts: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Topic {
            id: row.id,
            section_id: row.section_id,
            user_id: row.user_id,
            name: row.name,
            count_posts: row.count_posts,
            created_at: row.created_at,
            updated_at: row.updated_at,
            section: None,
            user: None,
            posts: Vec::new(),
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &TopicFilters) {
    Conditions::new(qb)
        .any_of("t.id", filters.ids.as_deref())
        .any_of("t.section_id", filters.section_ids.as_deref())
        .any_of("t.user_id", filters.user_ids.as_deref());
}

#[derive(Debug, Clone)]
pub struct TopicRepository {
    pool: SqlitePool,
}

impl TopicRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TopicRepository { pool }
    }

    pub async fn create(&self, sess: &Session, topic: &TopicAdd) -> DbResult<EntityId> {
        debug!(
            session_id = %sess.id,
            section_id = topic.section_id,
            user_id = topic.user_id,
            "Inserting topic"
        );

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let id = sqlx::query(
            r#"
            INSERT INTO topics (section_id, user_id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(topic.section_id)
        .bind(topic.user_id)
        .bind(&topic.name)
        .bind(Utc::now())
        .execute(conn.get()?)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn update_fields(&self, sess: &Session, edit: &TopicEdit) -> DbResult<()> {
        debug!(session_id = %sess.id, topic_id = edit.id, "Updating topic");

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE topics SET updated_at = ");
        qb.push_bind(Utc::now());
        push_set(&mut qb, "section_id", edit.section_id);
        push_set(&mut qb, "user_id", edit.user_id);
        push_set(&mut qb, "name", edit.name.as_deref());
        qb.push(" WHERE id = ")
            .push_bind(edit.id)
            .push(" AND deleted_at IS NULL");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let result = qb.build().execute(conn.get()?).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Topic", edit.id));
        }
        Ok(())
    }

    pub async fn soft_delete(&self, sess: &Session, ids: &[EntityId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        debug!(session_id = %sess.id, ?ids, "Deleting topics");

        let now = Utc::now();
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE topics SET deleted_at = ");
        qb.push_bind(now).push(", updated_at = ").push_bind(now);
        push_id_list(&mut qb, ids);
        qb.push(" AND deleted_at IS NULL");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        Ok(qb.build().execute(conn.get()?).await?.rows_affected())
    }

    pub async fn get_by_id(&self, sess: &Session, id: EntityId) -> DbResult<Topic> {
        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let row = sqlx::query_as::<_, TopicRow>(&format!("{TOPIC_SELECT} AND t.id = ?1"))
            .bind(id)
            .fetch_optional(conn.get()?)
            .await?;

        row.map(Topic::from)
            .ok_or_else(|| DbError::not_found("Topic", id))
    }

    pub async fn list(
        &self,
        sess: &Session,
        filters: &TopicFilters,
        pagination: Pagination,
        sort: TopicSort,
    ) -> DbResult<Vec<Topic>> {
        debug!(session_id = %sess.id, ?filters, "Listing topics");

        let mut qb = QueryBuilder::<Sqlite>::new(TOPIC_SELECT);
        push_filters(&mut qb, filters);
        push_page(&mut qb, sort, pagination);

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let rows = qb.build_query_as::<TopicRow>().fetch_all(conn.get()?).await?;

        Ok(rows.into_iter().map(Topic::from).collect())
    }

    /// Every live topic id matching the filter, unpaginated.
    pub async fn matching_ids(&self, sess: &Session, filter: &TopicDelete) -> DbResult<Vec<EntityId>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.id FROM topics t WHERE t.deleted_at IS NULL");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY t.id");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let ids = qb
            .build_query_scalar::<i64>()
            .fetch_all(conn.get()?)
            .await?;
        Ok(ids)
    }
}

// =============================================================================
// Storage Port
// =============================================================================

#[async_trait]
impl Transactioner for TopicRepository {
    async fn begin(&self, _sess: &Session) -> ForumResult<Box<dyn Transaction>> {
        tx::begin(&self.pool).await
    }
}

#[async_trait]
impl TopicStorage for TopicRepository {
    async fn insert(&self, sess: &Session, topic: &TopicAdd) -> ForumResult<EntityId> {
        Ok(self.create(sess, topic).await?)
    }

    async fn update(&self, sess: &Session, edit: &TopicEdit) -> ForumResult<()> {
        Ok(self.update_fields(sess, edit).await?)
    }

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()> {
        self.soft_delete(sess, ids).await?;
        Ok(())
    }

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Topic> {
        Ok(self.get_by_id(sess, id).await?)
    }

    async fn select_all(
        &self,
        sess: &Session,
        filters: &TopicFilters,
        pagination: Pagination,
        sort: TopicSort,
    ) -> ForumResult<Vec<Topic>> {
        Ok(self.list(sess, filters, pagination, sort).await?)
    }

    async fn ids_to_delete(
        &self,
        sess: &Session,
        filter: &TopicDelete,
    ) -> ForumResult<Vec<EntityId>> {
        Ok(self.matching_ids(sess, filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{database, insert_section, insert_user, session};
    use forum_core::{SortOrder, TopicSortBy};

    fn newest_first() -> TopicSort {
        TopicSort::new(TopicSortBy::CreatedAt, SortOrder::Desc)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = database().await;
        let repo = db.topics();
        let sess = session();
        let section = insert_section(db.pool(), "General").await;
        let user = insert_user(db.pool(), "alice").await;

        let id = repo
            .create(
                &sess,
                &TopicAdd {
                    section_id: section,
                    user_id: user,
                    name: "Hello".into(),
                },
            )
            .await
            .unwrap();

        let topic = repo.get_by_id(&sess, id).await.unwrap();
        assert_eq!(topic.section_id, section);
        assert_eq!(topic.user_id, user);
        assert_eq!(topic.count_posts, 0);
    }

    #[tokio::test]
    async fn test_unknown_section_violates_foreign_key() {
        let db = database().await;
        let user = insert_user(db.pool(), "alice").await;

        let err = db
            .topics()
            .create(
                &session(),
                &TopicAdd {
                    section_id: 404,
                    user_id: user,
                    name: "Lost".into(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn test_filters_by_section_and_user() {
        let db = database().await;
        let repo = db.topics();
        let sess = session();
        let general = insert_section(db.pool(), "General").await;
        let news = insert_section(db.pool(), "News").await;
        let alice = insert_user(db.pool(), "alice").await;
        let bob = insert_user(db.pool(), "bob").await;

        for (section, user) in [(general, alice), (general, bob), (news, alice)] {
            repo.create(
                &sess,
                &TopicAdd {
                    section_id: section,
                    user_id: user,
                    name: "t".into(),
                },
            )
            .await
            .unwrap();
        }

        let in_general = repo
            .list(&sess, &TopicFilters::by_section_ids(vec![general]), Pagination::new(20, 1), newest_first())
            .await
            .unwrap();
        assert_eq!(in_general.len(), 2);

        let filters = TopicFilters {
            section_ids: Some(vec![general]),
            user_ids: Some(vec![alice]),
            ..Default::default()
        };
        let mine = repo
            .list(&sess, &filters, Pagination::new(20, 1), newest_first())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, alice);
    }

    #[tokio::test]
    async fn test_matching_ids_skips_deleted() {
        let db = database().await;
        let repo = db.topics();
        let sess = session();
        let section = insert_section(db.pool(), "General").await;
        let user = insert_user(db.pool(), "alice").await;

        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let add = TopicAdd {
                section_id: section,
                user_id: user,
                name: name.into(),
            };
            ids.push(repo.create(&sess, &add).await.unwrap());
        }
        repo.soft_delete(&sess, &ids[..1]).await.unwrap();

        let found = repo
            .matching_ids(&sess, &TopicDelete::by_user_ids(vec![user]))
            .await
            .unwrap();
        assert_eq!(found, ids[1..].to_vec());

        let none = repo.matching_ids(&sess, &TopicDelete::default()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_move_to_another_section() {
        let db = database().await;
        let repo = db.topics();
        let sess = session();
        let general = insert_section(db.pool(), "General").await;
        let news = insert_section(db.pool(), "News").await;
        let user = insert_user(db.pool(), "alice").await;
        let id = repo
            .create(
                &sess,
                &TopicAdd {
                    section_id: general,
                    user_id: user,
                    name: "Hello".into(),
                },
            )
            .await
            .unwrap();

        let edit = TopicEdit {
            id,
            section_id: Some(news),
            ..Default::default()
        };
        repo.update_fields(&sess, &edit).await.unwrap();

        let topic = repo.get_by_id(&sess, id).await.unwrap();
        assert_eq!(topic.section_id, news);
        assert_eq!(topic.name, "Hello");
    }
}
