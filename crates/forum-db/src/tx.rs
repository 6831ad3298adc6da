//! # Transactions
//!
//! Bridges the type-erased [`forum_core::Transaction`] held by a session to
//! a concrete sqlx transaction, and hands repositories the right connection
//! for each call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Conn::acquire(&pool, &sess)                                            │
//! │       │                                                                 │
//! │       ├── sess has TxHandle ──► lock slot ──► downcast ──► &mut conn   │
//! │       │                         (held for one repository call)          │
//! │       │                                                                 │
//! │       └── no transaction ─────► pool.acquire() ──────────► &mut conn   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping a [`SqliteTransaction`] without committing rolls it back, which
//! is what makes cancelled requests leave no partial writes.

use std::any::Any;

use async_trait::async_trait;
use forum_core::{ForumResult, Session, Transaction};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tokio::sync::MutexGuard;

use crate::error::{DbError, DbResult};

/// A sqlx SQLite transaction installed into a session.
pub struct SqliteTransaction(sqlx::Transaction<'static, Sqlite>);

impl SqliteTransaction {
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        Ok(SqliteTransaction(pool.begin().await?))
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(self: Box<Self>) -> ForumResult<()> {
        self.0.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> ForumResult<()> {
        self.0.rollback().await.map_err(DbError::from)?;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Opens a transaction for `begin` implementations of the storage ports.
pub(crate) async fn begin(pool: &SqlitePool) -> ForumResult<Box<dyn Transaction>> {
    let tx = SqliteTransaction::begin(pool).await?;
    Ok(Box::new(tx))
}

/// The connection a repository call runs on.
pub(crate) enum Conn<'s> {
    Tx(MutexGuard<'s, Option<Box<dyn Transaction>>>),
    Pooled(PoolConnection<Sqlite>),
}

impl<'s> Conn<'s> {
    /// Joins the session's transaction, or checks out a pooled connection.
    pub(crate) async fn acquire(pool: &SqlitePool, sess: &'s Session) -> DbResult<Conn<'s>> {
        match sess.transaction() {
            Some(handle) => Ok(Conn::Tx(handle.lock().await)),
            None => Ok(Conn::Pooled(pool.acquire().await?)),
        }
    }

    pub(crate) fn get(&mut self) -> DbResult<&mut SqliteConnection> {
        match self {
            Conn::Tx(slot) => {
                let tx = (**slot).as_mut().ok_or_else(|| {
                    DbError::TransactionFailed("transaction is already finished".to_string())
                })?;
                let tx = tx
                    .as_any_mut()
                    .downcast_mut::<SqliteTransaction>()
                    .ok_or_else(|| {
                        DbError::TransactionFailed("transaction belongs to another storage".to_string())
                    })?;
                Ok(&mut *tx.0)
            }
            Conn::Pooled(conn) => Ok(&mut **conn),
        }
    }
}
