use std::any::Any;

use tracing::debug;

use crate::binder::{bind_params, Argument, ArgumentMap, BindSource};
use crate::error::PgBindError;
use crate::executor::Executor;
use crate::mapper::{map_result, ColumnPolicy, Destination};
use crate::model::registry::ModelRegistry;
use crate::model::Model;
use crate::types::RowValues;

enum Returning<'a, M> {
    None,
    One(&'a mut M),
    Many(&'a mut Vec<M>),
}

/// A mutating statement bound to a source model value.
///
/// `@key` placeholders read from the source; an optional `RETURNING`
/// destination maps the statement's result rows back.
pub struct Command<'a, M: Model> {
    executor: &'a dyn Executor,
    registry: &'a ModelRegistry,
    columns: ColumnPolicy,
    sql: &'a str,
    src: &'a M,
    returning: Returning<'a, M>,
    args: ArgumentMap,
}

impl<'a, M: Model> Command<'a, M> {
    #[must_use]
    pub fn new(
        executor: &'a dyn Executor,
        registry: &'a ModelRegistry,
        sql: &'a str,
        src: &'a M,
    ) -> Self {
        Command {
            executor,
            registry,
            columns: ColumnPolicy::default(),
            sql,
            src,
            returning: Returning::None,
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

    /// Map the statement's single result row (e.g. `RETURNING *`) onto
    /// `dest`.
    #[must_use]
    pub fn returning(mut self, dest: &'a mut M) -> Self {
        self.returning = Returning::One(dest);
        self
    }

    /// Map any number of result rows onto `dest`, in cursor order.
    #[must_use]
    pub fn returning_all(mut self, dest: &'a mut Vec<M>) -> Self {
        self.returning = Returning::Many(dest);
        self
    }

    /// Execute the command; returns the affected (or returned) row count.
    ///
    /// # Errors
    /// Template, binding, executor, and mapping errors, in pipeline order;
    /// binding failures mean nothing was sent to the database.
    pub async fn exec(self) -> Result<u64, PgBindError> {
        let parsed = self.registry.parsed::<M>()?;
        let compiled = parsed.sql_func(self.sql)?;

        let params = {
            let source = BindSource::Struct(self.src as &dyn Any);
            bind_params(&compiled, &source, &self.args, &parsed.accessors)?
        };

        debug!(sql = compiled.sql(), params = params.len(), "executing command");
        match self.returning {
            Returning::None => self.executor.execute_dml(compiled.sql(), &params).await,
            Returning::One(dest) => {
                let result_set = self.executor.execute_select(compiled.sql(), &params).await?;
                let count = result_set.len() as u64;
                map_result(result_set, Destination::One(dest), &parsed.accessors, self.columns)?;
                Ok(count)
            }
            Returning::Many(dest) => {
                let result_set = self.executor.execute_select(compiled.sql(), &params).await?;
                let count = result_set.len() as u64;
                map_result(result_set, Destination::Many(dest), &parsed.accessors, self.columns)?;
                Ok(count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::BindingError;
    use crate::pg_model;
    use crate::rows::ResultSet;

    #[derive(Default, Clone)]
    struct User {
        id: i64,
        name: String,
    }

    pg_model!(User { id, name });

    struct ScriptedExecutor {
        calls: Mutex<Vec<(String, Vec<RowValues>)>>,
        results: Mutex<Vec<ResultSet>>,
        affected: u64,
    }

    impl ScriptedExecutor {
        fn new(results: Vec<ResultSet>, affected: u64) -> Self {
            ScriptedExecutor {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(results),
                affected,
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
    async fn command_binds_model_and_argument_values() {
        let executor = ScriptedExecutor::new(vec![], 1);
        let registry = ModelRegistry::new();
        let user = User {
            id: 11,
            name: "kim".into(),
        };

        let affected = Command::new(
            &executor,
            &registry,
            "INSERT INTO users (id, name, org) VALUES (@id, @name, #org)",
            &user,
        )
        .with_arg("org", "ops")
        .exec()
        .await
        .unwrap();

        assert_eq!(affected, 1);
        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            "INSERT INTO users (id, name, org) VALUES ($1, $2, $3)"
        );
        assert_eq!(
            calls[0].1,
            vec![
                RowValues::Int(11),
                RowValues::Text("kim".into()),
                RowValues::Text("ops".into()),
            ]
        );
    }

    #[tokio::test]
    async fn returning_maps_the_result_row_back() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[(42, "generated")])], 1);
        let registry = ModelRegistry::new();
        let user = User {
            id: 0,
            name: "draft".into(),
        };
        let mut created = User::default();

        let count = Command::new(
            &executor,
            &registry,
            "INSERT INTO users (name) VALUES (@name) RETURNING id, name",
            &user,
        )
        .returning(&mut created)
        .exec()
        .await
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(created.id, 42);
        assert_eq!(created.name, "generated");
    }

    #[tokio::test]
    async fn returning_all_collects_every_row() {
        let executor = ScriptedExecutor::new(vec![user_rows(&[(1, "a"), (2, "b")])], 2);
        let registry = ModelRegistry::new();
        let user = User::default();
        let mut updated: Vec<User> = Vec::new();

        let count = Command::new(
            &executor,
            &registry,
            "UPDATE users SET name = @name RETURNING id, name",
            &user,
        )
        .returning_all(&mut updated)
        .exec()
        .await
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[1].id, 2);
    }

    #[tokio::test]
    async fn missing_model_field_fails_before_execution() {
        let executor = ScriptedExecutor::new(vec![], 0);
        let registry = ModelRegistry::new();
        let user = User::default();

        let err = Command::new(
            &executor,
            &registry,
            "INSERT INTO users (x) VALUES (@nosuch)",
            &user,
        )
        .exec()
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            PgBindError::Binding(BindingError::FieldNotFound(key)) if key == "nosuch"
        ));
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn round_trip_preserves_field_values() {
        // Write through a command with RETURNING, read back through the
        // same keys: field values survive both mappings.
        let original = User {
            id: 5,
            name: "loop".into(),
        };
        let echo = user_rows(&[(5, "loop")]);
        let executor = ScriptedExecutor::new(vec![echo.clone(), echo], 1);
        let registry = ModelRegistry::new();

        let mut written = User::default();
        Command::new(
            &executor,
            &registry,
            "INSERT INTO users (id, name) VALUES (@id, @name) RETURNING id, name",
            &original,
        )
        .returning(&mut written)
        .exec()
        .await
        .unwrap();

        let mut read_back = User::default();
        crate::query::Query::new(
            &executor,
            &registry,
            "SELECT id, name FROM users WHERE id = #id",
            &mut read_back,
        )
        .with_arg("id", 5i64)
        .exec()
        .await
        .unwrap();

        assert_eq!(written.id, original.id);
        assert_eq!(written.name, original.name);
        assert_eq!(read_back.id, original.id);
        assert_eq!(read_back.name, original.name);
    }
}
