//! # Session
//!
//! Per-request context threaded explicitly through every operation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  transport ──► Session::new() + requested fields                       │
//! │                    │                                                    │
//! │                    ▼  authenticate (optional)                          │
//! │               Session { user_id, level, restriction }                  │
//! │                    │                                                    │
//! │                    ▼  use-case ──► service::do_transaction             │
//! │               clone + TxHandle ──► storage calls join the transaction  │
//! │                    │                                                    │
//! │                    ▼  commit / rollback                                │
//! │               handle emptied; the caller's Session never saw it        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sessions are cheap to clone. A clone shares the transaction handle but
//! owns its requested-field tree, so narrowing the tree for a nested call
//! never leaks back to the caller.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{ForumError, ForumResult};
use crate::fields::RequestedFields;
use crate::types::{EntityId, User, UserLevel, UserRestriction};

// =============================================================================
// Transaction
// =============================================================================

/// An open storage transaction, type-erased so the domain layer never
/// names the storage engine.
///
/// Storage implementations recover their concrete type through
/// [`Transaction::as_any_mut`]. Dropping an unfinished transaction must
/// roll it back.
#[async_trait]
pub trait Transaction: Send + 'static {
    async fn commit(self: Box<Self>) -> ForumResult<()>;

    async fn rollback(self: Box<Self>) -> ForumResult<()>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared slot holding the request's open transaction.
///
/// Empty once the transaction has been committed or rolled back.
#[derive(Clone)]
pub struct TxHandle(Arc<Mutex<Option<Box<dyn Transaction>>>>);

impl TxHandle {
    pub fn new(tx: Box<dyn Transaction>) -> Self {
        TxHandle(Arc::new(Mutex::new(Some(tx))))
    }

    /// Locks the slot for the duration of one storage call.
    pub async fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Transaction>>> {
        self.0.lock().await
    }

    pub async fn commit(&self) -> ForumResult<()> {
        match self.0.lock().await.take() {
            Some(tx) => tx.commit().await,
            None => Err(ForumError::internal("Transaction is already finished")),
        }
    }

    pub async fn rollback(&self) -> ForumResult<()> {
        match self.0.lock().await.take() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TxHandle")
    }
}

// =============================================================================
// Session
// =============================================================================

/// Identity, authorization state, open transaction and field selection for
/// one request.
#[derive(Debug, Clone)]
pub struct Session {
    /// Correlation id stamped on every error and log line.
    pub id: String,
    /// 0 for anonymous callers.
    pub user_id: EntityId,
    pub level: UserLevel,
    pub restriction: UserRestriction,
    pub requested_fields: RequestedFields,
    transaction: Option<TxHandle>,
}

impl Session {
    /// Anonymous session with a fresh correlation id.
    pub fn new() -> Self {
        Session {
            id: Uuid::new_v4().to_string(),
            user_id: 0,
            level: UserLevel::None,
            restriction: UserRestriction::None,
            requested_fields: RequestedFields::new(),
            transaction: None,
        }
    }

    pub fn with_requested_fields(mut self, fields: RequestedFields) -> Self {
        self.requested_fields = fields;
        self
    }

    /// Same request, now acting as `user`.
    pub fn authenticated_as(&self, user: &User) -> Session {
        Session {
            user_id: user.id,
            level: user.level,
            restriction: user.restriction,
            ..self.clone()
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.user_id != 0
    }

    pub fn is_admin(&self) -> bool {
        self.level.at_least(UserLevel::Admin)
    }

    pub fn is_moderator(&self) -> bool {
        self.level.at_least(UserLevel::Mod)
    }

    /// Copy of this session whose field tree is `fields`.
    pub fn narrowed(&self, fields: &RequestedFields) -> Session {
        Session {
            requested_fields: fields.clone(),
            ..self.clone()
        }
    }

    /// Copy of this session narrowed to the sub-tree under `name`.
    pub fn narrowed_to(&self, name: &str) -> Session {
        self.narrowed(self.requested_fields.get(name))
    }

    pub fn transaction(&self) -> Option<&TxHandle> {
        self.transaction.as_ref()
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Copy of this session bound to `tx`.
    pub fn with_transaction(&self, tx: TxHandle) -> Session {
        Session {
            transaction: Some(tx),
            ..self.clone()
        }
    }

    /// Copy of this session with no transaction, for post-commit work.
    pub fn detached(&self) -> Session {
        Session {
            transaction: None,
            ..self.clone()
        }
    }

    /// Stamps the correlation id and caller id onto `err`.
    pub fn enrich(&self, err: ForumError) -> ForumError {
        err.with_context(&self.id, self.user_id)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::keys;
    use std::sync::atomic::{AtomicU8, Ordering};

    const COMMITTED: u8 = 1;
    const ROLLED_BACK: u8 = 2;

    struct FakeTx(Arc<AtomicU8>);

    #[async_trait]
    impl Transaction for FakeTx {
        async fn commit(self: Box<Self>) -> ForumResult<()> {
            self.0.store(COMMITTED, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> ForumResult<()> {
            self.0.store(ROLLED_BACK, Ordering::SeqCst);
            Ok(())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let sess = Session::new();

        assert!(!sess.is_authorized());
        assert!(!sess.in_transaction());
        assert_eq!(sess.id.len(), 36);
    }

    #[test]
    fn test_narrowing_leaves_original_untouched() {
        let sess = Session::new()
            .with_requested_fields(RequestedFields::from_paths(["posts.user", "user"]));

        let inner = sess.narrowed_to(keys::POSTS);

        assert!(inner.requested_fields.contains(keys::USER));
        assert!(!inner.requested_fields.contains(keys::POSTS));
        assert!(sess.requested_fields.contains(keys::POSTS));
        assert_eq!(inner.id, sess.id);
    }

    #[tokio::test]
    async fn test_clones_share_transaction() {
        let state = Arc::new(AtomicU8::new(0));
        let handle = TxHandle::new(Box::new(FakeTx(state.clone())));
        let sess = Session::new().with_transaction(handle);
        let clone = sess.narrowed_to("anything");

        clone.transaction().unwrap().commit().await.unwrap();

        assert_eq!(state.load(Ordering::SeqCst), COMMITTED);
        assert!(sess.transaction().unwrap().lock().await.is_none());
        assert!(sess.transaction().unwrap().commit().await.is_err());
        assert!(sess.detached().transaction().is_none());
    }

    #[tokio::test]
    async fn test_rollback_after_finish_is_noop() {
        let state = Arc::new(AtomicU8::new(0));
        let handle = TxHandle::new(Box::new(FakeTx(state.clone())));

        handle.rollback().await.unwrap();
        handle.rollback().await.unwrap();

        assert_eq!(state.load(Ordering::SeqCst), ROLLED_BACK);
    }

    #[test]
    fn test_enrich() {
        let mut sess = Session::new();
        sess.user_id = 42;

        let err = sess.enrich(ForumError::forbidden());

        assert_eq!(err.user_id, Some(42));
        assert_eq!(err.session_id.as_deref(), Some(sess.id.as_str()));
    }
}
