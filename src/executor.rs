use async_trait::async_trait;

use crate::command::Command;
use crate::error::PgBindError;
use crate::model::Model;
use crate::query::Query;
use crate::rows::ResultSet;
use crate::types::RowValues;

/// Whatever services a statement: the connection pool or an open
/// transaction. Builders are generic over this seam, which also makes the
/// full pipeline drivable from tests without a live server.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a DML statement and return the affected-row count.
    async fn execute_dml(&self, sql: &str, params: &[RowValues]) -> Result<u64, PgBindError>;

    /// Execute a row-returning statement and materialize its rows.
    async fn execute_select(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, PgBindError>;
}

/// Query/command construction shared by [`Client`](crate::Client) and
/// [`TxContext`](crate::TxContext), so call sites look the same whichever
/// executor ends up servicing the statement.
pub trait Queryable {
    /// A query whose single result row lands in `dest`. The destination
    /// also serves as the binding source for `@key` placeholders.
    fn query<'a, M: Model>(&'a self, sql: &'a str, dest: &'a mut M) -> Query<'a, M>;

    /// A query appending any number of result rows to `dest`. `@key`
    /// placeholders cannot bind from a sequence destination.
    fn query_all<'a, M: Model>(&'a self, sql: &'a str, dest: &'a mut Vec<M>) -> Query<'a, M>;

    /// A command binding `@key` placeholders from `src`.
    fn command<'a, M: Model>(&'a self, sql: &'a str, src: &'a M) -> Command<'a, M>;
}
