//! # Error Types
//!
//! The forum error taxonomy.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  forum-core errors (this file)                                         │
//! │  ├── ForumError       - kind + message + session context               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  forum-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                              │
//! │        DbError ─────────┴─► ForumError ─► Session::enrich ─► caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error that leaves a use-case carries the correlation id of the
//! session that produced it and the caller's user id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Classification of a failure, independent of its message.
///
/// Serialized as SCREAMING_SNAKE_CASE so transports can switch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Internal,
    AlreadyExists,
    NotFound,
    Validation,
    /// The caller is not authenticated.
    NotAuthorized,
    /// The caller is authenticated but lacks the privilege level.
    Forbidden,
    /// The caller is authenticated but restricted from the action.
    Restricted,
    InvalidCredentials,
    /// The caller tried to authenticate an already authenticated session.
    AlreadyAuthorized,
    /// Transport-level storage fault (connection, pool, I/O).
    DatabaseFailure,
    /// Storage-reported constraint or query fault.
    DatabaseError,
}

impl ErrorKind {
    /// Message used when an error of this kind is raised without one.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal error",
            ErrorKind::AlreadyExists => "Already exists",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Validation => "Validation failed",
            ErrorKind::NotAuthorized => "Unauthorized",
            ErrorKind::Forbidden => "You don't have permissions to do it",
            ErrorKind::Restricted => "You are restricted from doing it",
            ErrorKind::InvalidCredentials => "Invalid login or password",
            ErrorKind::AlreadyAuthorized => "You're already logged in",
            ErrorKind::DatabaseFailure => "Database failure",
            ErrorKind::DatabaseError => "Database error",
        }
    }
}

// =============================================================================
// Forum Error
// =============================================================================

/// The single error type returned by every forum operation.
///
/// ## Shape on the wire
/// ```json
/// {
///   "kind": "NOT_FOUND",
///   "message": "Topic not found",
///   "session_id": "0b6f...",
///   "user_id": 7
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ForumError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl ForumError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ForumError {
            kind,
            message: message.into(),
            session_id: None,
            user_id: None,
        }
    }

    /// Creates an error of `kind` with its default message.
    pub fn of(kind: ErrorKind) -> Self {
        ForumError::new(kind, kind.default_message())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ForumError::new(ErrorKind::Internal, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ForumError::new(ErrorKind::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        ForumError::new(ErrorKind::AlreadyExists, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ForumError::new(ErrorKind::Validation, message)
    }

    pub fn not_authorized() -> Self {
        ForumError::of(ErrorKind::NotAuthorized)
    }

    pub fn forbidden() -> Self {
        ForumError::of(ErrorKind::Forbidden)
    }

    pub fn restricted() -> Self {
        ForumError::of(ErrorKind::Restricted)
    }

    pub fn banned() -> Self {
        ForumError::new(ErrorKind::Restricted, "You are banned")
    }

    pub fn invalid_credentials() -> Self {
        ForumError::of(ErrorKind::InvalidCredentials)
    }

    /// Returns true if this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Attaches the session correlation id and caller id.
    ///
    /// Context already present is kept, so the innermost session wins.
    pub fn with_context(mut self, session_id: &str, user_id: i64) -> Self {
        if self.session_id.is_none() {
            self.session_id = Some(session_id.to_string());
        }
        if self.user_id.is_none() {
            self.user_id = Some(user_id);
        }
        self
    }
}

/// Result type for forum operations.
pub type ForumResult<T> = Result<T, ForumError>;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage call. Converted into [`ErrorKind::Validation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Field is required but was empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field length is out of range (measured in characters).
    #[error("{field} must be between {min} and {max} characters long")]
    Length { field: String, min: usize, max: usize },

    /// Numeric field is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Too many entries in a list argument.
    #[error("{field} must contain at most {max} entries")]
    TooMany { field: String, max: usize },
}

impl From<ValidationError> for ForumError {
    fn from(err: ValidationError) -> Self {
        ForumError::validation(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
