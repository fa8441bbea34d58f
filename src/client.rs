use async_trait::async_trait;
use deadpool_postgres::{Pool, Runtime};
use serde::Deserialize;
use tokio_postgres::NoTls;
use tracing::debug;

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

fn default_port() -> u16 {
    5432
}

/// Connection settings for [`Client::connect`].
///
/// Deserializable so it can be read straight out of an application's config
/// file; only `host`, `dbname`, and `user` are required to be non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub application_name: Option<String>,
    /// Fail queries when a result column has no matching model field.
    #[serde(default)]
    pub deny_unknown_columns: bool,
}

impl Config {
    /// Config with the default port and lenient column handling.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        dbname: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Config {
            host: host.into(),
            port: default_port(),
            dbname: dbname.into(),
            user: user.into(),
            password: password.into(),
            application_name: None,
            deny_unknown_columns: false,
        }
    }
}

/// Handle to a PostgreSQL pool plus the model/template caches.
///
/// Queries and commands built from the client execute against the pool;
/// inside [`Client::transactional`] the same builders come from the
/// transaction context instead. The registry lives and dies with the
/// client.
pub struct Client {
    pub(crate) pool: Pool,
    pub(crate) registry: ModelRegistry,
    pub(crate) columns: ColumnPolicy,
}

impl Client {
    /// Create a pool from `config` and verify connectivity with a ping.
    ///
    /// # Errors
    /// `ConfigError` for missing required fields, `ConnectionError` if the
    /// pool cannot be created, or the ping's driver error.
    pub async fn connect(config: Config) -> Result<Client, PgBindError> {
        if config.host.is_empty() {
            return Err(PgBindError::ConfigError("host is required".to_string()));
        }
        if config.dbname.is_empty() {
            return Err(PgBindError::ConfigError("dbname is required".to_string()));
        }
        if config.user.is_empty() {
            return Err(PgBindError::ConfigError("user is required".to_string()));
        }

        let columns = if config.deny_unknown_columns {
            ColumnPolicy::DenyUnknown
        } else {
            ColumnPolicy::IgnoreUnknown
        };

        let mut pg_config = deadpool_postgres::Config::new();
        pg_config.host = Some(config.host);
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.dbname);
        pg_config.user = Some(config.user);
        pg_config.password = Some(config.password);
        pg_config.application_name = config.application_name;

        let pool = pg_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| {
                PgBindError::ConnectionError(format!("failed to create Postgres pool: {e}"))
            })?;

        let client = Client {
            pool,
            registry: ModelRegistry::new(),
            columns,
        };
        client.ping().await?;
        debug!("connected to postgres");
        Ok(client)
    }

    /// Wrap an externally constructed pool. No connectivity check is
    /// performed.
    #[must_use]
    pub fn from_pool(pool: Pool) -> Client {
        Client {
            pool,
            registry: ModelRegistry::new(),
            columns: ColumnPolicy::default(),
        }
    }

    /// Override the unknown-column policy.
    #[must_use]
    pub fn column_policy(mut self, columns: ColumnPolicy) -> Client {
        self.columns = columns;
        self
    }

    /// Check out a connection and run a trivial statement against it.
    ///
    /// # Errors
    /// Pool or driver errors.
    pub async fn ping(&self) -> Result<(), PgBindError> {
        let conn = self.pool.get().await?;
        conn.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Snapshot of pool statistics.
    #[must_use]
    pub fn status(&self) -> deadpool::Status {
        self.pool.status()
    }

    /// Close the pool; future checkouts fail.
    pub fn close(&self) {
        self.pool.close();
    }

    /// The underlying pool, for anything this layer does not wrap.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// The model/template cache, scoped to this client.
    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }
}

#[async_trait]
impl Executor for Client {
    async fn execute_dml(&self, sql: &str, params: &[RowValues]) -> Result<u64, PgBindError> {
        let conn = self.pool.get().await?;
        let converted = Params::convert(params);
        let rows = conn.execute(sql, converted.as_refs()).await?;
        Ok(rows)
    }

    async fn execute_select(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, PgBindError> {
        let conn = self.pool.get().await?;
        let converted = Params::convert(params);
        let rows = conn.query(sql, converted.as_refs()).await?;
        build_result_set(&rows)
    }
}

impl Queryable for Client {
    fn query<'a, M: Model>(&'a self, sql: &'a str, dest: &'a mut M) -> Query<'a, M> {
        Query::new(self, &self.registry, sql, dest).column_policy(self.columns)
    }

    fn query_all<'a, M: Model>(&'a self, sql: &'a str, dest: &'a mut Vec<M>) -> Query<'a, M> {
        Query::new_all(self, &self.registry, sql, dest).column_policy(self.columns)
    }

    fn command<'a, M: Model>(&'a self, sql: &'a str, src: &'a M) -> Command<'a, M> {
        Command::new(self, &self.registry, sql, src).column_policy(self.columns)
    }
}
