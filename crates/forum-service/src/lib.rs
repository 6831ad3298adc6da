//! # forum-service: Orchestration Layer for the Forum Backend
//!
//! Everything between a decoded request and the storage ports: use-cases
//! with their authorization rules, entity services with transactions,
//! reference checks, cascades and relation embedding.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Transport (external)                                                  │
//! │    Session { id, user, level, restriction, requested_fields }          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ┌───────────────┐   policy checks, notifications after commit         │
//! │  │   usecase::*  │                                                      │
//! │  └───────┬───────┘                                                      │
//! │          ▼                                                              │
//! │  ┌───────────────┐   do_transaction, refs, cascades, embedding         │
//! │  │   service::*  │◄──── adapters (Weak siblings) ────┐                 │
//! │  └───────┬───────┘                                   │                 │
//! │          ▼                                           │                 │
//! │  forum-core ports ──► forum-db repositories ─────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let forum = Forum::open(ForumConfig::load(None)?).await?;
//! let sess = forum.users().authenticate(&Session::new(), "alice", "secret-pw").await?;
//! let post = forum.posts().add(&sess, PostAdd { topic_id: 3, text: "Hi".into(), ..Default::default() }).await?;
//! ```
//!
//! ## Modules
//!
//! - [`usecase`] - Operation surface with authorization and side effects
//! - [`service`] - Entity services
//! - [`adapters`] - Narrow sibling interfaces between services
//! - [`transaction`] - Transaction coordinator
//! - [`config`] - `ForumConfig` loading
//! - [`credentials`] - Argon2 password hashing

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adapters;
pub mod config;
pub mod credentials;
mod forum;
pub mod service;
pub mod transaction;
pub mod usecase;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{ConfigError, ForumConfig};
pub use credentials::Argon2Hasher;
pub use forum::Forum;
pub use usecase::{NotificationUseCase, PostUseCase, SectionUseCase, TopicUseCase, UserUseCase};
