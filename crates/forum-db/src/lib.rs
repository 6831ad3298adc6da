//! # forum-db: SQLite Storage for the Forum Backend
//!
//! Implements the [`forum_core::ports`] storage traits on SQLite through
//! sqlx, including joining the transaction a [`forum_core::Session`] carries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Forum Data Flow                                  │
//! │                                                                         │
//! │  forum-service (PostUseCase::add)                                      │
//! │       │  Arc<dyn PostStorage>                                           │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     forum-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (user.rs ...) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ UserRepo      │    │ 001_forum_   │  │   │
//! │  │   │               │    │ TopicRepo ... │    │  schema.sql  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │                        ┌───────▼───────┐                        │   │
//! │  │                        │  tx::Conn     │ session tx or pooled   │   │
//! │  │                        └───────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (forum.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and their forum error mapping
//! - [`repository`] - Storage port implementations
//! - [`tx`] - Session transactions over sqlx
//!
//! ## Usage
//!
//! ```rust,ignore
//! use forum_db::{Database, DbConfig};
//! use forum_core::ports::UserStorage;
//!
//! let db = Database::new(DbConfig::new("forum.db")).await?;
//!
//! let users = db.users();
//! let alice = users.select_by_id(&sess, 1).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
mod query;
pub mod repository;
pub mod tx;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use tx::SqliteTransaction;

// Repository re-exports for convenience
pub use repository::{
    NotificationRepository, PostRepository, SectionRepository, TopicRepository, UserRepository,
};
