//! Live-server tests. Ignored by default; point the `PGBIND_TEST_*`
//! environment variables at a scratch database and run with
//! `cargo test -- --ignored`.

use pgbind::prelude::*;
use pgbind::pg_model;

#[derive(Default, Clone, Debug, PartialEq)]
struct Visitor {
    id: i64,
    name: String,
}

pg_model!(Visitor { id, name });

fn live_config() -> Option<Config> {
    let host = std::env::var("PGBIND_TEST_HOST").ok()?;
    let dbname = std::env::var("PGBIND_TEST_DB").ok()?;
    let user = std::env::var("PGBIND_TEST_USER").ok()?;
    let password = std::env::var("PGBIND_TEST_PASSWORD").unwrap_or_default();
    Some(Config::new(host, dbname, user, password))
}

fn table_name() -> String {
    format!("pgbind_visitors_{}", std::process::id())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL server (set PGBIND_TEST_HOST/DB/USER/PASSWORD)"]
async fn transactional_commit_and_rollback_visibility() {
    let config = live_config().expect("PGBIND_TEST_* env vars not set");
    let client = Client::connect(config).await.unwrap();
    let table = table_name();
    let ddl_src = Visitor::default();

    client
        .command(
            &format!("CREATE TABLE {table} (id BIGINT PRIMARY KEY, name TEXT NOT NULL)"),
            &ddl_src,
        )
        .exec()
        .await
        .unwrap();

    // Committed work is visible afterwards.
    let committed = Visitor {
        id: 1,
        name: "committed".into(),
    };
    client
        .transactional(|tx| {
            let committed = committed.clone();
            let table = table.clone();
            Box::pin(async move {
                tx.command(
                    &format!("INSERT INTO {table} (id, name) VALUES (@id, @name)"),
                    &committed,
                )
                .exec()
                .await?;
                Ok(())
            })
        })
        .await
        .unwrap();

    let mut seen = Visitor::default();
    client
        .query(
            &format!("SELECT id, name FROM {table} WHERE id = #id"),
            &mut seen,
        )
        .with_arg("id", 1i64)
        .exec()
        .await
        .unwrap();
    assert_eq!(seen, committed);

    // A failing work closure rolls back and returns its error unchanged.
    let doomed = Visitor {
        id: 2,
        name: "rolled back".into(),
    };
    let err = client
        .transactional(|tx| {
            let doomed = doomed.clone();
            let table = table.clone();
            Box::pin(async move {
                tx.command(
                    &format!("INSERT INTO {table} (id, name) VALUES (@id, @name)"),
                    &doomed,
                )
                .exec()
                .await?;
                Err(PgBindError::ConnectionError("intentional failure".into()))
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PgBindError::ConnectionError(msg) if msg == "intentional failure"
    ));

    let mut after_rollback: Vec<Visitor> = Vec::new();
    client
        .query_all(
            &format!("SELECT id, name FROM {table} WHERE id = #id"),
            &mut after_rollback,
        )
        .with_arg("id", 2i64)
        .exec()
        .await
        .unwrap();
    assert!(after_rollback.is_empty());

    client
        .command(&format!("DROP TABLE {table}"), &ddl_src)
        .exec()
        .await
        .unwrap();
    client.close();
}
