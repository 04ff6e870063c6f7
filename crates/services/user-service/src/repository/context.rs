//! Call-scoped execution context and transaction boundaries.
//!
//! A [`Context`] is a small `Copy` value handed to every repository call. It
//! optionally borrows an open [`DatabaseTransaction`] and optionally carries a
//! deadline. Repository code resolves its executor with
//! [`Context::transaction`], so the same operation joins an ambient
//! transaction when there is one and uses the pool otherwise.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tokio::time::Instant;

use common::{AppError, AppResult};

/// Execution context for one logical request.
#[derive(Clone, Copy, Default)]
pub struct Context<'a> {
    txn: Option<&'a DatabaseTransaction>,
    deadline: Option<Instant>,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("in_transaction", &self.in_transaction())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Context<'static> {
    /// Root context: no transaction, no deadline.
    pub fn background() -> Self {
        Self::default()
    }
}

impl<'a> Context<'a> {
    /// Active transaction handle, if any.
    pub fn transaction(&self) -> Option<&'a DatabaseTransaction> {
        self.txn
    }

    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Derive a context that expires after `timeout`. An earlier existing
    /// deadline is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a context bound to `txn`, keeping the deadline.
    pub(crate) fn with_transaction<'t>(&self, txn: &'t DatabaseTransaction) -> Context<'t> {
        Context {
            txn: Some(txn),
            deadline: self.deadline,
        }
    }

    /// Await `fut`, failing with [`AppError::Timeout`] once the deadline passes.
    pub async fn run<F, T>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .unwrap_or(Err(AppError::Timeout)),
            None => fut.await,
        }
    }
}

/// Transaction boundary.
///
/// Note: the generic method keeps this trait from being object safe, so
/// consumers are generic over it.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Run `f` inside a transaction.
    ///
    /// `f` receives a context carrying the transaction. It commits when `f`
    /// succeeds and rolls back when `f` fails or the context deadline passes.
    /// A context that already carries a transaction is passed through
    /// unchanged: the nested call joins the outer transaction, which keeps
    /// ownership of commit and rollback.
    async fn execute_in_transaction<F, T>(&self, ctx: &Context<'_>, f: F) -> AppResult<T>
    where
        F: for<'c> FnOnce(Context<'c>) -> BoxFuture<'c, AppResult<T>> + Send,
        T: Send;
}

/// SeaORM-backed transaction boundary.
#[derive(Clone)]
pub struct TransactionManager {
    db: DatabaseConnection,
}

impl TransactionManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Transaction for TransactionManager {
    async fn execute_in_transaction<F, T>(&self, ctx: &Context<'_>, f: F) -> AppResult<T>
    where
        F: for<'c> FnOnce(Context<'c>) -> BoxFuture<'c, AppResult<T>> + Send,
        T: Send,
    {
        if ctx.in_transaction() {
            tracing::debug!("Joining ambient transaction");
            return f(*ctx).await;
        }

        let txn = self.db.begin().await.map_err(AppError::from)?;
        let tx_ctx = ctx.with_transaction(&txn);

        let result = tx_ctx.run(f(tx_ctx)).await;

        settle(txn, result).await
    }
}

/// Terminal operations of an open transaction.
#[async_trait]
trait Settle: Send + Sized {
    async fn commit(self) -> Result<(), DbErr>;
    async fn rollback(self) -> Result<(), DbErr>;
}

#[async_trait]
impl Settle for DatabaseTransaction {
    async fn commit(self) -> Result<(), DbErr> {
        DatabaseTransaction::commit(self).await
    }

    async fn rollback(self) -> Result<(), DbErr> {
        DatabaseTransaction::rollback(self).await
    }
}

/// Commit on success, roll back on failure.
///
/// A commit failure becomes the result. A rollback failure is logged and the
/// original error is returned.
async fn settle<S: Settle, T: Send>(txn: S, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// Run a block inside a transaction.
///
/// ```ignore
/// in_transaction!(self.tx, ctx, |tx_ctx| repo.update(&tx_ctx, changes).await)
/// ```
#[macro_export]
macro_rules! in_transaction {
    ($tx:expr, $ctx:expr, |$inner:ident| $body:expr) => {
        $tx.execute_in_transaction($ctx, move |$inner| {
            ::std::boxed::Box::pin(async move { $body })
        })
        .await
    };
}
