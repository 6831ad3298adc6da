//! # Transaction Coordinator
//!
//! Single-level transaction scoping shared by every entity service.
//!
//! ```text
//! do_transaction(storage, sess, body)
//!      │
//!      ├── sess already in a transaction ──► body(sess)      (join)
//!      │
//!      └── otherwise
//!            begin ──► sess' = sess + tx ──► body(sess')
//!                                               │
//!                              Ok ──► commit ───┤
//!                              Err ─► rollback ─┘
//!
//! Dropped before completion: the SqliteTransaction inside the handle is
//! dropped with it, which rolls back.
//! ```

use std::future::Future;

use forum_core::ports::Transactioner;
use forum_core::{ForumResult, Session, TxHandle};
use tracing::{debug, warn};

/// Runs `body` inside a transaction, opening one only if `sess` has none.
///
/// The session passed to `body` carries the transaction; every storage call
/// made by `body` must use it.
pub async fn do_transaction<S, T, F, Fut>(storage: &S, sess: &Session, body: F) -> ForumResult<T>
where
    S: Transactioner + ?Sized,
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = ForumResult<T>>,
{
    if sess.in_transaction() {
        return body(sess.clone()).await;
    }

    let handle = TxHandle::new(storage.begin(sess).await?);
    debug!(session_id = %sess.id, "Transaction opened");

    match body(sess.with_transaction(handle.clone())).await {
        Ok(value) => {
            handle.commit().await?;
            debug!(session_id = %sess.id, "Transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = handle.rollback().await {
                warn!(
                    session_id = %sess.id,
                    error = %rollback_err,
                    "Rollback failed"
                );
            }
            debug!(session_id = %sess.id, error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}
