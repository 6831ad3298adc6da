//! # User Repository
//!
//! Users live in `users`; their secondary info in `users_info`, one row per
//! user created together with the account.
//!
//! ## Sparse Update
//! ```text
//! UserEdit { id: 7, nickname: Some("neo"), level: Some(Mod), .. None }
//!
//!   UPDATE users SET updated_at = ?, nickname = ?, level = ?
//!   WHERE id = ? AND deleted_at IS NULL
//!
//!   users_info is touched only when edit.info is Some, and only the
//!   provided columns change (COALESCE upsert).
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_core::ports::{Transactioner, UserCredentials, UserStorage};
use forum_core::{
    EntityId, ForumResult, Pagination, Session, Transaction, User, UserAdd, UserEdit, UserFilters,
    UserInfo, UserLevel, UserRestriction, UserSort,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::query::{push_id_list, push_page, push_set, Cmp, Conditions};
use crate::tx::{self, Conn};

const USER_COLUMNS: &str = "id, nickname, show_info, rank, level, restriction, \
                            count_topics, count_posts, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    nickname: String,
    show_info: bool,
    rank: i64,
    level: UserLevel,
    restriction: UserRestriction,
    count_topics: i64,
    count_posts: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            nickname: row.nickname,
            show_info: row.show_info,
            rank: row.rank,
            level: row.level,
            restriction: row.restriction,
            count_topics: row.count_topics,
            count_posts: row.count_posts,
            created_at: row.created_at,
            updated_at: row.updated_at,
            info: None,
            topics: Vec::new(),
            posts: Vec::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password: String,
}

#[derive(Debug, sqlx::FromRow)]
struct InfoRow {
    user_id: i64,
    phone: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Repository for users and their secondary info.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts the user and an info row. Runs both statements on the same
    /// connection; callers wanting atomicity pass a transactional session.
    pub async fn create(&self, sess: &Session, user: &UserAdd) -> DbResult<EntityId> {
        debug!(session_id = %sess.id, nickname = %user.nickname, "Inserting user");

        let now = Utc::now();
        let mut conn = Conn::acquire(&self.pool, sess).await?;

        let id = sqlx::query(
            r#"
            INSERT INTO users (nickname, password, show_info, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&user.nickname)
        .bind(&user.password)
        .bind(user.show_info)
        .bind(now)
        .execute(conn.get()?)
        .await?
        .last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO users_info (user_id, phone, email, first_name, last_name)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id)
        .bind(&user.info.phone)
        .bind(&user.info.email)
        .bind(&user.info.first_name)
        .bind(&user.info.last_name)
        .execute(conn.get()?)
        .await?;

        Ok(id)
    }

    /// Applies a sparse update.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no live user with that id
    pub async fn update_fields(&self, sess: &Session, edit: &UserEdit) -> DbResult<()> {
        debug!(session_id = %sess.id, user_id = edit.id, "Updating user");

        let mut conn = Conn::acquire(&self.pool, sess).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        qb.push_bind(Utc::now());
        push_set(&mut qb, "nickname", edit.nickname.as_deref());
        push_set(&mut qb, "password", edit.password.as_deref());
        push_set(&mut qb, "show_info", edit.show_info);
        push_set(&mut qb, "rank", edit.rank);
        push_set(&mut qb, "count_topics", edit.count_topics);
        push_set(&mut qb, "count_posts", edit.count_posts);
        push_set(&mut qb, "level", edit.level);
        push_set(&mut qb, "restriction", edit.restriction);
        qb.push(" WHERE id = ")
            .push_bind(edit.id)
            .push(" AND deleted_at IS NULL");

        let result = qb.build().execute(conn.get()?).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", edit.id));
        }

        if let Some(info) = &edit.info {
            sqlx::query(
                r#"
                INSERT INTO users_info (user_id, phone, email, first_name, last_name)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (user_id) DO UPDATE SET
                    phone = COALESCE(excluded.phone, users_info.phone),
                    email = COALESCE(excluded.email, users_info.email),
                    first_name = COALESCE(excluded.first_name, users_info.first_name),
                    last_name = COALESCE(excluded.last_name, users_info.last_name)
                "#,
            )
            .bind(edit.id)
            .bind(&info.phone)
            .bind(&info.email)
            .bind(&info.first_name)
            .bind(&info.last_name)
            .execute(conn.get()?)
            .await?;
        }

        Ok(())
    }

    /// Marks users as deleted. Already deleted ids are ignored.
    pub async fn soft_delete(&self, sess: &Session, ids: &[EntityId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        debug!(session_id = %sess.id, ?ids, "Deleting users");

        let now = Utc::now();
        let mut conn = Conn::acquire(&self.pool, sess).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET deleted_at = ");
        qb.push_bind(now).push(", updated_at = ").push_bind(now);
        push_id_list(&mut qb, ids);
        qb.push(" AND deleted_at IS NULL");

        Ok(qb.build().execute(conn.get()?).await?.rows_affected())
    }

    pub async fn get_by_id(&self, sess: &Session, id: EntityId) -> DbResult<User> {
        let mut conn = Conn::acquire(&self.pool, sess).await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(conn.get()?)
        .await?;

        row.map(User::from).ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn get_by_nickname(
        &self,
        sess: &Session,
        nickname: &str,
    ) -> DbResult<Option<UserCredentials>> {
        let mut conn = Conn::acquire(&self.pool, sess).await?;

        let row = sqlx::query_as::<_, CredentialsRow>(&format!(
            "SELECT {USER_COLUMNS}, password FROM users WHERE nickname = ?1 AND deleted_at IS NULL"
        ))
        .bind(nickname)
        .fetch_optional(conn.get()?)
        .await?;

        Ok(row.map(|row| UserCredentials {
            user: row.user.into(),
            password_hash: row.password,
        }))
    }

    pub async fn list(
        &self,
        sess: &Session,
        filters: &UserFilters,
        pagination: Pagination,
        sort: UserSort,
    ) -> DbResult<Vec<User>> {
        debug!(session_id = %sess.id, ?filters, "Listing users");

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL"
        ));
        Conditions::new(&mut qb)
            .any_of("id", filters.ids.as_deref())
            .cmp("rank", Cmp::Ge, filters.rank_from)
            .cmp("rank", Cmp::Le, filters.rank_to)
            .cmp("level", Cmp::Eq, filters.level)
            .cmp("restriction", Cmp::Eq, filters.restriction)
            .cmp("count_posts", Cmp::Ge, filters.count_posts_from)
            .cmp("count_posts", Cmp::Le, filters.count_posts_to);
        push_page(&mut qb, sort, pagination);

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let rows = qb.build_query_as::<UserRow>().fetch_all(conn.get()?).await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn list_info(
        &self,
        sess: &Session,
        ids: &[EntityId],
    ) -> DbResult<Vec<(EntityId, UserInfo)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT user_id, phone, email, first_name, last_name FROM users_info",
        );
        qb.push(" WHERE user_id IN (");
        let mut list = qb.separated(", ");
        for id in ids {
            list.push_bind(*id);
        }
        list.push_unseparated(")");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let rows = qb.build_query_as::<InfoRow>().fetch_all(conn.get()?).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let info = UserInfo {
                    phone: row.phone,
                    email: row.email,
                    first_name: row.first_name,
                    last_name: row.last_name,
                };
                (row.user_id, info)
            })
            .collect())
    }

    /// Number of live users.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Storage Port
// =============================================================================

#[async_trait]
impl Transactioner for UserRepository {
    async fn begin(&self, _sess: &Session) -> ForumResult<Box<dyn Transaction>> {
        tx::begin(&self.pool).await
    }
}

#[async_trait]
impl UserStorage for UserRepository {
    async fn insert(&self, sess: &Session, user: &UserAdd) -> ForumResult<EntityId> {
        Ok(self.create(sess, user).await?)
    }

    async fn update(&self, sess: &Session, edit: &UserEdit) -> ForumResult<()> {
        Ok(self.update_fields(sess, edit).await?)
    }

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()> {
        self.soft_delete(sess, ids).await?;
        Ok(())
    }

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<User> {
        Ok(self.get_by_id(sess, id).await?)
    }

    async fn select_by_nickname(
        &self,
        sess: &Session,
        nickname: &str,
    ) -> ForumResult<Option<UserCredentials>> {
        Ok(self.get_by_nickname(sess, nickname).await?)
    }

    async fn select_all(
        &self,
        sess: &Session,
        filters: &UserFilters,
        pagination: Pagination,
        sort: UserSort,
    ) -> ForumResult<Vec<User>> {
        Ok(self.list(sess, filters, pagination, sort).await?)
    }

    async fn select_info(
        &self,
        sess: &Session,
        ids: &[EntityId],
    ) -> ForumResult<Vec<(EntityId, UserInfo)>> {
        Ok(self.list_info(sess, ids).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
