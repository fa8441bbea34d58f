//! Model-binding query layer for PostgreSQL.
//!
//! SQL templates name their parameters instead of numbering them: `@key`
//! binds a field of the model by logical column key, `#key` binds a named
//! argument supplied at call time. Templates compile once per model type
//! into positional statements, and result rows map back onto models through
//! the same per-type accessor tables. Queries and commands run against the
//! pool, or inside [`Client::transactional`] against the open transaction,
//! through the same builder API.
//!
//! ```no_run
//! use pgbind::prelude::*;
//!
//! #[derive(Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! pgbind::pg_model!(User { id, name });
//!
//! # async fn demo() -> Result<(), PgBindError> {
//! let client = Client::connect(Config::new("localhost", "app", "app", "secret")).await?;
//!
//! let user = User { id: 1, name: "alice".into() };
//! client
//!     .command("INSERT INTO users (id, name) VALUES (@id, @name)", &user)
//!     .exec()
//!     .await?;
//!
//! let mut found = User::default();
//! client
//!     .query("SELECT id, name FROM users WHERE id = #id", &mut found)
//!     .with_arg("id", 1i64)
//!     .exec()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod binder;
mod client;
mod command;
mod error;
mod executor;
mod mapper;
pub mod model;
mod params;
mod query;
mod rows;
pub mod template;
mod transaction;
mod types;

pub mod prelude;

pub use binder::Argument;
pub use client::{Client, Config};
pub use command::Command;
pub use error::{AccessError, BindingError, MappingError, PgBindError, TemplateError};
pub use executor::{Executor, Queryable};
pub use mapper::ColumnPolicy;
pub use model::registry::ModelRegistry;
pub use model::{Model, Shape, ShapeBuilder};
pub use params::Params;
pub use query::Query;
pub use rows::{build_result_set, extract_value, DbRow, ResultSet};
pub use transaction::{TxContext, TxOptions};
pub use types::{FromRowValue, RowValues};

// Driver types callers commonly need alongside this crate.
pub use deadpool_postgres::Pool;
pub use tokio_postgres::IsolationLevel;
