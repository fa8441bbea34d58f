use async_trait::async_trait;
use deadpool_postgres::Transaction;
use futures_util::future::BoxFuture;
use tokio_postgres::IsolationLevel;
use tracing::debug;

use crate::client::Client;
use crate::command::Command;
use crate::error::PgBindError;
use crate::executor::{Executor, Queryable};
use crate::mapper::ColumnPolicy;
use crate::model::registry::ModelRegistry;
use crate::model::Model;
use crate::params::Params;
use crate::query::Query;
use crate::rows::{build_result_set, ResultSet};
use crate::types::RowValues;

/// Options for [`Client::transactional_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TxOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
    pub deferrable: bool,
}

impl TxOptions {
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn with_deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = deferrable;
        self
    }
}

/// An open transaction plus the client's caches.
///
/// Handed to the work closure of [`Client::transactional`]; every query or
/// command built from it executes inside the transaction. Read-only after
/// construction and bounded by the enclosing call.
pub struct TxContext<'a> {
    pub(crate) tx: Transaction<'a>,
    pub(crate) registry: &'a ModelRegistry,
    pub(crate) columns: ColumnPolicy,
}

impl Client {
    /// Run `work` inside a transaction with default options.
    ///
    /// # Errors
    /// See [`Client::transactional_with`].
    pub async fn transactional<F>(&self, work: F) -> Result<(), PgBindError>
    where
        F: for<'t> FnOnce(&'t TxContext<'t>) -> BoxFuture<'t, Result<(), PgBindError>>,
    {
        self.transactional_with(TxOptions::default(), work).await
    }

    /// Begin a transaction, run `work` against it, then commit if `work`
    /// returned `Ok` or roll back if it returned `Err`.
    ///
    /// ```no_run
    /// # use pgbind::prelude::*;
    /// # #[derive(Default)]
    /// # struct User { id: i64, name: String }
    /// # pgbind::pg_model!(User { id, name });
    /// # async fn demo(client: &Client, user: User) -> Result<(), PgBindError> {
    /// client
    ///     .transactional(|tx| {
    ///         Box::pin(async move {
    ///             tx.command("UPDATE users SET name = @name WHERE id = @id", &user)
    ///                 .exec()
    ///                 .await?;
    ///             Ok(())
    ///         })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// A begin failure returns immediately with no transaction open. A
    /// `work` error is returned unchanged after a successful rollback; if
    /// the rollback itself fails, [`PgBindError::RollbackFailed`] carries
    /// both errors. Commit failures pass through from the driver.
    pub async fn transactional_with<F>(&self, options: TxOptions, work: F) -> Result<(), PgBindError>
    where
        F: for<'t> FnOnce(&'t TxContext<'t>) -> BoxFuture<'t, Result<(), PgBindError>>,
    {
        let mut conn = self.pool.get().await?;

        let mut builder = conn.build_transaction();
        if let Some(isolation) = options.isolation {
            builder = builder.isolation_level(isolation);
        }
        if options.read_only {
            builder = builder.read_only(true);
        }
        if options.deferrable {
            builder = builder.deferrable(true);
        }
        let tx = builder.start().await?;
        debug!("transaction started");

        let ctx = TxContext {
            tx,
            registry: &self.registry,
            columns: self.columns,
        };

        match work(&ctx).await {
            Ok(()) => {
                let TxContext { tx, .. } = ctx;
                tx.commit().await?;
                debug!("transaction committed");
                Ok(())
            }
            Err(original) => {
                let TxContext { tx, .. } = ctx;
                match tx.rollback().await {
                    Ok(()) => {
                        debug!("transaction rolled back");
                        Err(original)
                    }
                    Err(rollback) => Err(PgBindError::RollbackFailed {
                        original: Box::new(original),
                        rollback: Box::new(rollback.into()),
                    }),
                }
            }
        }
    }
}

#[async_trait]
impl Executor for TxContext<'_> {
    async fn execute_dml(&self, sql: &str, params: &[RowValues]) -> Result<u64, PgBindError> {
        let converted = Params::convert(params);
        let rows = self.tx.execute(sql, converted.as_refs()).await?;
        Ok(rows)
    }

    async fn execute_select(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, PgBindError> {
        let converted = Params::convert(params);
        let rows = self.tx.query(sql, converted.as_refs()).await?;
        build_result_set(&rows)
    }
}

impl Queryable for TxContext<'_> {
    fn query<'a, M: Model>(&'a self, sql: &'a str, dest: &'a mut M) -> Query<'a, M> {
        Query::new(self, self.registry, sql, dest).column_policy(self.columns)
    }

    fn query_all<'a, M: Model>(&'a self, sql: &'a str, dest: &'a mut Vec<M>) -> Query<'a, M> {
        Query::new_all(self, self.registry, sql, dest).column_policy(self.columns)
    }

    fn command<'a, M: Model>(&'a self, sql: &'a str, src: &'a M) -> Command<'a, M> {
        Command::new(self, self.registry, sql, src).column_policy(self.columns)
    }
}
