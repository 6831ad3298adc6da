//! # forum-core: Domain Layer for the Forum Backend
//!
//! Entities, the per-request [`Session`], the requested-field tree, storage
//! port traits and the error taxonomy. No I/O happens here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Forum Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Transport (external collaborator)                  │   │
//! │  │    decodes request ──► Session + typed input                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          forum-service (use-cases, services, wiring)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ forum-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  session  │  │   ports   │  │  policy   │  │   │
//! │  │   │ User,Post │  │  fields   │  │ *Storage  │  │validation │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │            forum-db (implements the ports on SQLite)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities, inputs, filters, sorting and pagination
//! - [`session`] - Session, transaction handle
//! - [`fields`] - Requested-field tree
//! - [`ports`] - Storage port traits and the credential primitive
//! - [`policy`] - Authorization checks
//! - [`validation`] - Input validation
//! - [`error`] - Error taxonomy

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fields;
pub mod policy;
pub mod ports;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ErrorKind, ForumError, ForumResult, ValidationError};
pub use fields::RequestedFields;
pub use session::{Session, Transaction, TxHandle};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Posts needed per rank step unless configured otherwise.
pub const DEFAULT_POSTS_PER_RANK: i64 = 50;

/// Page size applied when a listing has no pagination.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// First page number.
pub const DEFAULT_PAGE: i64 = 1;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

pub const MIN_NICKNAME_LENGTH: usize = 3;
pub const MAX_NICKNAME_LENGTH: usize = 32;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_SECTION_NAME_LENGTH: usize = 128;
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;
pub const MAX_TOPIC_NAME_LENGTH: usize = 256;
pub const MAX_POST_LENGTH: usize = 10_000;
pub const MAX_INFO_FIELD_LENGTH: usize = 128;
