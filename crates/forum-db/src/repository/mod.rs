//! # Repositories
//!
//! One repository per entity, each implementing its storage port.
//!
//! ## Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  impl XxxStorage for XxxRepository      (ForumResult, port boundary)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  inherent methods                       (DbResult, raw sqlx errors)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Conn::acquire(&pool, &sess) ──► session transaction or pooled conn    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod notification;
pub mod post;
pub mod section;
pub mod topic;
pub mod user;

pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use section::SectionRepository;
pub use topic::TopicRepository;
pub use user::UserRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use forum_core::{EntityId, Session};
    use sqlx::SqlitePool;

    use crate::pool::{Database, DbConfig};

    pub(crate) async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub(crate) fn session() -> Session {
        Session::new()
    }

    pub(crate) async fn insert_user(pool: &SqlitePool, nickname: &str) -> EntityId {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (nickname, password, created_at, updated_at) VALUES (?1, 'digest', ?2, ?2)",
        )
        .bind(nickname)
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    pub(crate) async fn insert_section(pool: &SqlitePool, name: &str) -> EntityId {
        let now = Utc::now();
        sqlx::query("INSERT INTO sections (name, created_at, updated_at) VALUES (?1, ?2, ?2)")
            .bind(name)
            .bind(now)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub(crate) async fn insert_topic(
        pool: &SqlitePool,
        section_id: EntityId,
        user_id: EntityId,
        name: &str,
    ) -> EntityId {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO topics (section_id, user_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(section_id)
        .bind(user_id)
        .bind(name)
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }
}
