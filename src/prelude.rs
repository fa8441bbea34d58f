//! Convenient imports for common functionality.

pub use crate::{
    Argument, Client, ColumnPolicy, Config, DbRow, IsolationLevel, Model, PgBindError, Queryable,
    ResultSet, RowValues, TxContext, TxOptions, pg_model,
};
