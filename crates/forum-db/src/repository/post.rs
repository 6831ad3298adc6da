//! # Post Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_core::ports::{PostStorage, Transactioner};
use forum_core::{
    EntityId, ForumResult, Pagination, Post, PostAdd, PostDelete, PostEdit, PostFilters, PostSort,
    Session, Transaction,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::query::{push_id_list, push_page, push_set, Conditions};
use crate::tx::{self, Conn};

const POST_SELECT: &str = r#"
    SELECT p.id, p.topic_id, p.user_id, p.text, p.created_at, p.updated_at
    FROM posts p
    WHERE p.deleted_at IS NULL"#;

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    topic_id: i64,
    user_id: i64,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            topic_id: row.topic_id,
            user_id: row.user_id,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
            topic: None,
            user: None,
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &PostFilters) {
    Conditions::new(qb)
        .any_of("p.id", filters.ids.as_deref())
        .any_of("p.topic_id", filters.topic_ids.as_deref())
        .any_of("p.user_id", filters.user_ids.as_deref());
}

#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PostRepository { pool }
    }

    pub async fn create(&self, sess: &Session, post: &PostAdd) -> DbResult<EntityId> {
        debug!(
            session_id = %sess.id,
            topic_id = post.topic_id,
            user_id = post.user_id,
            "Inserting post"
        );

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let id = sqlx::query(
            r#"
            INSERT INTO posts (topic_id, user_id, text, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(post.topic_id)
        .bind(post.user_id)
        .bind(&post.text)
        .bind(Utc::now())
        .execute(conn.get()?)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn update_fields(&self, sess: &Session, edit: &PostEdit) -> DbResult<()> {
        debug!(session_id = %sess.id, post_id = edit.id, "Updating post");

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE posts SET updated_at = ");
        qb.push_bind(Utc::now());
        push_set(&mut qb, "topic_id", edit.topic_id);
        push_set(&mut qb, "user_id", edit.user_id);
        push_set(&mut qb, "text", edit.text.as_deref());
        qb.push(" WHERE id = ")
            .push_bind(edit.id)
            .push(" AND deleted_at IS NULL");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let result = qb.build().execute(conn.get()?).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Post", edit.id));
        }
        Ok(())
    }

    pub async fn soft_delete(&self, sess: &Session, ids: &[EntityId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        debug!(session_id = %sess.id, ?ids, "Deleting posts");

        let now = Utc::now();
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE posts SET deleted_at = ");
        qb.push_bind(now).push(", updated_at = ").push_bind(now);
        push_id_list(&mut qb, ids);
        qb.push(" AND deleted_at IS NULL");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        Ok(qb.build().execute(conn.get()?).await?.rows_affected())
    }

    pub async fn get_by_id(&self, sess: &Session, id: EntityId) -> DbResult<Post> {
        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} AND p.id = ?1"))
            .bind(id)
            .fetch_optional(conn.get()?)
            .await?;

        row.map(Post::from).ok_or_else(|| DbError::not_found("Post", id))
    }

    pub async fn list(
        &self,
        sess: &Session,
        filters: &PostFilters,
        pagination: Pagination,
        sort: PostSort,
    ) -> DbResult<Vec<Post>> {
        debug!(session_id = %sess.id, ?filters, "Listing posts");

        let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
        push_filters(&mut qb, filters);
        push_page(&mut qb, sort, pagination);

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let rows = qb.build_query_as::<PostRow>().fetch_all(conn.get()?).await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Every live post id matching the filter, unpaginated.
    pub async fn matching_ids(&self, sess: &Session, filter: &PostDelete) -> DbResult<Vec<EntityId>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT p.id FROM posts p WHERE p.deleted_at IS NULL");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY p.id");

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
impl Transactioner for PostRepository {
    async fn begin(&self, _sess: &Session) -> ForumResult<Box<dyn Transaction>> {
        tx::begin(&self.pool).await
    }
}

#[async_trait]
impl PostStorage for PostRepository {
    async fn insert(&self, sess: &Session, post: &PostAdd) -> ForumResult<EntityId> {
        Ok(self.create(sess, post).await?)
    }

    async fn update(&self, sess: &Session, edit: &PostEdit) -> ForumResult<()> {
        Ok(self.update_fields(sess, edit).await?)
    }

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()> {
        self.soft_delete(sess, ids).await?;
        Ok(())
    }

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Post> {
        Ok(self.get_by_id(sess, id).await?)
    }

    async fn select_all(
        &self,
        sess: &Session,
        filters: &PostFilters,
        pagination: Pagination,
        sort: PostSort,
    ) -> ForumResult<Vec<Post>> {
        Ok(self.list(sess, filters, pagination, sort).await?)
    }

    async fn ids_to_delete(&self, sess: &Session, filter: &PostDelete) -> ForumResult<Vec<EntityId>> {
        Ok(self.matching_ids(sess, filter).await?)
    }
}
