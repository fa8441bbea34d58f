use tracing::debug;

use crate::binder::{bind_params, Argument, ArgumentMap};
use crate::error::PgBindError;
use crate::executor::Executor;
use crate::mapper::{bind_source, map_result, ColumnPolicy, Destination};
use crate::model::registry::ModelRegistry;
use crate::model::Model;
use crate::types::RowValues;

/// A row-returning statement bound to a destination model value.
///
/// Built from a [`Queryable`](crate::Queryable) handle; [`Query::exec`]
/// runs the full pipeline: registry lookup, template compilation, argument
/// binding, execution, row mapping.
pub struct Query<'a, M: Model> {
    executor: &'a dyn Executor,
    registry: &'a ModelRegistry,
    columns: ColumnPolicy,
    sql: &'a str,
    dest: Destination<'a, M>,
    args: ArgumentMap,
}

impl<'a, M: Model> Query<'a, M> {
    /// Query with a single-struct destination. The destination doubles as
    /// the binding source for `@key` placeholders.
    #[must_use]
    pub fn new(
        executor: &'a dyn Executor,
        registry: &'a ModelRegistry,
        sql: &'a str,
        dest: &'a mut M,
    ) -> Self {
        Query {
            executor,
            registry,
            columns: ColumnPolicy::default(),
            sql,
            dest: Destination::One(dest),
            args: ArgumentMap::new(),
        }
    }

    /// Query with a sequence destination; rows append in cursor order.
    #[must_use]
    pub fn new_all(
        executor: &'a dyn Executor,
        registry: &'a ModelRegistry,
        sql: &'a str,
        dest: &'a mut Vec<M>,
    ) -> Self {
        Query {
            executor,
            registry,
            columns: ColumnPolicy::default(),
            sql,
            dest: Destination::Many(dest),
            args: ArgumentMap::new(),
        }
    }

    /// Override the unknown-column policy for this call.
    #[must_use]
    pub fn column_policy(mut self, columns: ColumnPolicy) -> Self {
        self.columns = columns;
        self
    }

    /// Supply one named argument for a `#key` placeholder.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Supply several named arguments at once.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = Argument>) -> Self {
        for arg in args {
            self.args.insert(arg.key, arg.value);
        }
        self
    }

    /// Execute the query and map its rows onto the destination.
    ///
    /// A single-struct destination requires exactly one result row;
    /// a sequence destination accepts any number, including zero.
    ///
    /// # Errors
    /// Template, binding, executor, and mapping errors, in pipeline order;
    /// binding failures mean nothing was sent to the database.
    pub async fn exec(self) -> Result<(), PgBindError> {
        let parsed = self.registry.parsed::<M>()?;
        let compiled = parsed.sql_func(self.sql)?;

        let params = {
            let source = bind_source(&self.dest);
            bind_params(&compiled, &source, &self.args, &parsed.accessors)?
        };

        debug!(sql = compiled.sql(), params = params.len(), "executing query");
        let result_set = self.executor.execute_select(compiled.sql(), &params).await?;

        map_result(result_set, self.dest, &parsed.accessors, self.columns)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{BindingError, MappingError};
    use crate::pg_model;
    use crate::rows::ResultSet;

    #[derive(Default)]
    struct User {
        id: i64,
        name: String,
    }

    pg_model!(User { id, name });

    /// Scripted executor: records every statement it receives and replays
    /// canned result sets.
    pub(crate) struct ScriptedExecutor {
        pub(crate) calls: Mutex<Vec<(String, Vec<RowValues>)>>,
        pub(crate) results: Mutex<Vec<ResultSet>>,
        pub(crate) affected: u64,
    }

    impl ScriptedExecutor {
        pub(crate) fn new(results: Vec<ResultSet>) -> Self {
            ScriptedExecutor {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(results),
                affected: 1,
            }
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute_dml(&self, sql: &str, params: &[RowValues]) -> Result<u64, PgBindError> {
            self.calls
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(self.affected)
        }

        async fn execute_select(
            &self,
            sql: &str,
            params: &[RowValues],
        ) -> Result<ResultSet, PgBindError> {
            self.calls
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Ok(ResultSet::default())
            } else {
                Ok(results.remove(0))
            }
        }
    }

    fn user_rows(rows: &[(i64, &str)]) -> ResultSet {
        let mut rs = ResultSet::new(vec!["id".into(), "name".into()]);
        for (id, name) in rows {
            rs.add_row(vec![RowValues::Int(*id), RowValues::Text((*name).into())]);
        }
        rs
    }

    #[tokio::test]
    async fn single_row_query_binds_and_maps() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[(7, "dana")])]);
        let registry = ModelRegistry::new();
        let mut dest = User::default();

        Query::new(
            &executor,
            &registry,
            "SELECT id, name FROM users WHERE id = #id",
            &mut dest,
        )
        .with_arg("id", 7i64)
        .exec()
        .await
        .unwrap();

        assert_eq!(dest.id, 7);
        assert_eq!(dest.name, "dana");

        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "SELECT id, name FROM users WHERE id = $1");
        assert_eq!(calls[0].1, vec![RowValues::Int(7)]);
    }

    #[tokio::test]
    async fn model_placeholders_bind_from_the_destination() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[(3, "refreshed")])]);
        let registry = ModelRegistry::new();
        let mut dest = User {
            id: 3,
            name: String::new(),
        };

        Query::new(
            &executor,
            &registry,
            "SELECT id, name FROM users WHERE id = @id",
            &mut dest,
        )
        .exec()
        .await
        .unwrap();

        assert_eq!(dest.name, "refreshed");
        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls[0].1, vec![RowValues::Int(3)]);
    }

    #[tokio::test]
    async fn sequence_query_collects_rows_in_order() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[(1, "a"), (2, "b")])]);
        let registry = ModelRegistry::new();
        let mut dest: Vec<User> = Vec::new();

        Query::new_all(&executor, &registry, "SELECT id, name FROM users", &mut dest)
            .exec()
            .await
            .unwrap();

        assert_eq!(dest.len(), 2);
        assert_eq!(dest[0].id, 1);
        assert_eq!(dest[1].name, "b");
    }

    #[tokio::test]
    async fn empty_result_into_sequence_is_ok() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[])]);
        let registry = ModelRegistry::new();
        let mut dest: Vec<User> = Vec::new();

        Query::new_all(&executor, &registry, "SELECT id, name FROM users", &mut dest)
            .exec()
            .await
            .unwrap();
        assert!(dest.is_empty());
    }

    #[tokio::test]
    async fn empty_result_into_struct_is_not_found() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[])]);
        let registry = ModelRegistry::new();
        let mut dest = User::default();

        let err = Query::new(&executor, &registry, "SELECT id, name FROM users", &mut dest)
            .exec()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PgBindError::Mapping(MappingError::NoRows)
        ));
    }

    #[tokio::test]
    async fn model_binding_from_sequence_destination_fails_before_execution() {
        let executor = ScriptedExecutor::new(vec![]);
        let registry = ModelRegistry::new();
        let mut dest: Vec<User> = Vec::new();

        let err = Query::new_all(
            &executor,
            &registry,
            "SELECT id, name FROM users WHERE id = @id",
            &mut dest,
        )
        .exec()
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            PgBindError::Binding(BindingError::SequenceSource)
        ));
        // Nothing reached the executor.
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_argument_fails_before_execution() {
        let executor = ScriptedExecutor::new(vec![]);
        let registry = ModelRegistry::new();
        let mut dest = User::default();

        let err = Query::new(
            &executor,
            &registry,
            "SELECT id, name FROM users WHERE id = #id",
            &mut dest,
        )
        .exec()
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            PgBindError::Binding(BindingError::ArgumentNotFound(key)) if key == "id"
        ));
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn with_args_accepts_argument_pairs() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[(1, "a")])]);
        let registry = ModelRegistry::new();
        let mut dest = User::default();

        Query::new(
            &executor,
            &registry,
            "SELECT id, name FROM users WHERE id = #id AND name = #name",
            &mut dest,
        )
        .with_args([
            Argument::new("id", 1i64),
            Argument::new("name", "a"),
        ])
        .exec()
        .await
        .unwrap();

        let calls = executor.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            vec![RowValues::Int(1), RowValues::Text("a".into())]
        );
    }
}
