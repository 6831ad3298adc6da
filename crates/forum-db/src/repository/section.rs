//! # Section Repository
//!
//! `count_topics` is never stored; every read derives it from live topics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_core::ports::{SectionStorage, Transactioner};
use forum_core::{
    EntityId, ForumResult, Pagination, Section, SectionAdd, SectionEdit, SectionFilters,
    SectionSort, Session, Transaction,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::query::{push_id_list, push_page, push_set, Conditions};
use crate::tx::{self, Conn};

const SECTION_SELECT: &str = r#"
    SELECT s.id, s.name, s.description, s.created_at, s.updated_at,
           (SELECT COUNT(*) FROM topics t
             WHERE t.section_id = s.id AND t.deleted_at IS NULL) AS count_topics
    FROM sections s
    WHERE s.deleted_at IS NULL"#;

#[derive(Debug, sqlx::FromRow)]
struct SectionRow {
    id: i64,
    name: String,
    description: Option<String>,
    count_topics: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SectionRow> for Section {
    fn from(row: SectionRow) -> Self {
        Section {
            id: row.id,
            name: row.name,
            description: row.description,
            count_topics: row.count_topics,
            created_at: row.created_at,
            updated_at: row.updated_at,
            topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionRepository {
    pool: SqlitePool,
}

impl SectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SectionRepository { pool }
    }

    pub async fn create(&self, sess: &Session, section: &SectionAdd) -> DbResult<EntityId> {
        debug!(session_id = %sess.id, name = %section.name, "Inserting section");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let id = sqlx::query(
            r#"
            INSERT INTO sections (name, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            "#,
        )
        .bind(&section.name)
        .bind(&section.description)
        .bind(Utc::now())
        .execute(conn.get()?)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn update_fields(&self, sess: &Session, edit: &SectionEdit) -> DbResult<()> {
        debug!(session_id = %sess.id, section_id = edit.id, "Updating section");

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE sections SET updated_at = ");
        qb.push_bind(Utc::now());
        push_set(&mut qb, "name", edit.name.as_deref());
        // Blank clears the column.
        let description = edit
            .description
            .as_deref()
            .map(|text| (!text.is_empty()).then_some(text));
        push_set(&mut qb, "description", description);
        qb.push(" WHERE id = ")
            .push_bind(edit.id)
            .push(" AND deleted_at IS NULL");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let result = qb.build().execute(conn.get()?).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Section", edit.id));
        }
        Ok(())
    }

    pub async fn soft_delete(&self, sess: &Session, ids: &[EntityId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        debug!(session_id = %sess.id, ?ids, "Deleting sections");

        let now = Utc::now();
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE sections SET deleted_at = ");
        qb.push_bind(now).push(", updated_at = ").push_bind(now);
        push_id_list(&mut qb, ids);
        qb.push(" AND deleted_at IS NULL");

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        Ok(qb.build().execute(conn.get()?).await?.rows_affected())
    }

    pub async fn get_by_id(&self, sess: &Session, id: EntityId) -> DbResult<Section> {
        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let row = sqlx::query_as::<_, SectionRow>(&format!("{SECTION_SELECT} AND s.id = ?1"))
            .bind(id)
            .fetch_optional(conn.get()?)
            .await?;

        row.map(Section::from)
            .ok_or_else(|| DbError::not_found("Section", id))
    }

    pub async fn list(
        &self,
        sess: &Session,
        filters: &SectionFilters,
        pagination: Pagination,
        sort: SectionSort,
    ) -> DbResult<Vec<Section>> {
        debug!(session_id = %sess.id, ?filters, "Listing sections");

        let mut qb = QueryBuilder::<Sqlite>::new(SECTION_SELECT);
        Conditions::new(&mut qb).any_of("s.id", filters.ids.as_deref());
        push_page(&mut qb, sort, pagination);

        let mut conn = Conn::acquire(&self.pool, sess).await?;
        let rows = qb
            .build_query_as::<SectionRow>()
            .fetch_all(conn.get()?)
            .await?;

        Ok(rows.into_iter().map(Section::from).collect())
    }
}

// =============================================================================
// Storage Port
// =============================================================================

#[async_trait]
impl Transactioner for SectionRepository {
    async fn begin(&self, _sess: &Session) -> ForumResult<Box<dyn Transaction>> {
        tx::begin(&self.pool).await
    }
}

#[async_trait]
impl SectionStorage for SectionRepository {
    async fn insert(&self, sess: &Session, section: &SectionAdd) -> ForumResult<EntityId> {
        Ok(self.create(sess, section).await?)
    }

    async fn update(&self, sess: &Session, edit: &SectionEdit) -> ForumResult<()> {
        Ok(self.update_fields(sess, edit).await?)
    }

    async fn delete(&self, sess: &Session, ids: &[EntityId]) -> ForumResult<()> {
        self.soft_delete(sess, ids).await?;
        Ok(())
    }

    async fn select_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Section> {
        Ok(self.get_by_id(sess, id).await?)
    }

    async fn select_all(
        &self,
        sess: &Session,
        filters: &SectionFilters,
        pagination: Pagination,
        sort: SectionSort,
    ) -> ForumResult<Vec<Section>> {
        Ok(self.list(sess, filters, pagination, sort).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{database, insert_topic, insert_user, session};
    use forum_core::{SectionSortBy, SortOrder};

    fn add(name: &str) -> SectionAdd {
        SectionAdd {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_count_topics_is_derived() {
        let db = database().await;
        let repo = db.sections();
        let sess = session();

        let section = repo.create(&sess, &add("General")).await.unwrap();
        let user = insert_user(db.pool(), "alice").await;
        insert_topic(db.pool(), section, user, "Hello").await;
        let gone = insert_topic(db.pool(), section, user, "Bye").await;
        db.topics().soft_delete(&sess, &[gone]).await.unwrap();

        let loaded = repo.get_by_id(&sess, section).await.unwrap();
        assert_eq!(loaded.name, "General");
        assert_eq!(loaded.count_topics, 1);
    }

    #[tokio::test]
    async fn test_update_description_sets_and_clears() {
        let db = database().await;
        let repo = db.sections();
        let sess = session();
        let id = repo.create(&sess, &add("General")).await.unwrap();

        let edit = SectionEdit {
            id,
            description: Some("Anything goes".into()),
            ..Default::default()
        };
        repo.update_fields(&sess, &edit).await.unwrap();

        let loaded = repo.get_by_id(&sess, id).await.unwrap();
        assert_eq!(loaded.name, "General");
        assert_eq!(loaded.description.as_deref(), Some("Anything goes"));

        let clear = SectionEdit {
            id,
            description: Some(String::new()),
            ..Default::default()
        };
        repo.update_fields(&sess, &clear).await.unwrap();

        let loaded = repo.get_by_id(&sess, id).await.unwrap();
        assert_eq!(loaded.name, "General");
        assert!(loaded.description.is_none());
    }

    #[tokio::test]
    async fn test_deleted_section_is_hidden() {
        let db = database().await;
        let repo = db.sections();
        let sess = session();
        let id = repo.create(&sess, &add("General")).await.unwrap();

        repo.soft_delete(&sess, &[id]).await.unwrap();

        assert!(matches!(
            repo.get_by_id(&sess, id).await,
            Err(DbError::NotFound { .. })
        ));
        let all = repo
            .list(
                &sess,
                &SectionFilters::default(),
                Pagination::new(20, 1),
                SectionSort::new(SectionSortBy::CreatedAt, SortOrder::Desc),
            )
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = database().await;
        let repo = db.sections();
        let sess = session();
        repo.create(&sess, &add("Off-topic")).await.unwrap();
        repo.create(&sess, &add("Announcements")).await.unwrap();

        let all = repo
            .list(
                &sess,
                &SectionFilters::default(),
                Pagination::new(20, 1),
                SectionSort::new(SectionSortBy::Name, SortOrder::Asc),
            )
            .await
            .unwrap();

        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Announcements", "Off-topic"]);
    }
}
