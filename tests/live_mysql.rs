//! End-to-end checks against a live MySQL server.
//!
//! These are ignored by default; run them with `cargo test -- --ignored`
//! and a reachable server. Connection overrides:
//! `CLUBCONNECT_TEST_HOST`, `CLUBCONNECT_TEST_PORT`,
//! `CLUBCONNECT_TEST_USER`, `CLUBCONNECT_TEST_PASSWORD`.

use std::collections::BTreeSet;

use clubconnect_db::bulk;
use clubconnect_db::engine::{connection, schema};
use clubconnect_db::ConnectionConfig;
use sqlx::MySqlPool;

fn test_config() -> ConnectionConfig {
    let env = |key: &str, fallback: &str| std::env::var(key).unwrap_or_else(|_| fallback.into());

    ConnectionConfig {
        host: env("CLUBCONNECT_TEST_HOST", "localhost"),
        port: env("CLUBCONNECT_TEST_PORT", "3306")
            .parse()
            .expect("valid test port"),
        username: env("CLUBCONNECT_TEST_USER", "root"),
        password: env("CLUBCONNECT_TEST_PASSWORD", "root"),
        database: "clubconnect_test".into(),
    }
}

/// Creates the test database and its full schema if anything is missing,
/// and returns a database-level pool.
async fn ensure_ready(config: &ConnectionConfig) -> MySqlPool {
    let server = connection::connect_server(config)
        .await
        .expect("server reachable");

    if !schema::database_exists(&server, &config.database)
        .await
        .expect("schemata query")
    {
        schema::create_database(&server, &config.database)
            .await
            .expect("create database");
    }
    server.close().await;

    let db = connection::connect_database(config)
        .await
        .expect("database reachable");
    let missing = schema::tables_missing(&db).await.expect("tables query");
    let report = schema::create_missing_tables(&db, &missing).await;
    assert!(report.is_complete(), "schema creation left gaps: {report:?}");

    db
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn fresh_database_is_created_and_reconciled_to_completion() {
    let config = test_config();
    let server = connection::connect_server(&config)
        .await
        .expect("server reachable");

    sqlx::query(&format!("DROP DATABASE IF EXISTS `{}`", config.database))
        .execute(&server)
        .await
        .expect("drop test database");

    assert!(!schema::database_exists(&server, &config.database)
        .await
        .unwrap());

    schema::create_database(&server, &config.database)
        .await
        .unwrap();
    assert!(schema::database_exists(&server, &config.database)
        .await
        .unwrap());
    // Detection is case-insensitive.
    assert!(schema::database_exists(&server, "CLUBCONNECT_TEST")
        .await
        .unwrap());

    let db = connection::connect_database(&config)
        .await
        .expect("database reachable");

    let missing = schema::tables_missing(&db).await.unwrap();
    assert_eq!(missing.len(), 10, "fresh database is missing every table");

    let report = schema::create_missing_tables(&db, &missing).await;
    assert!(report.is_complete());
    assert!(schema::tables_missing(&db).await.unwrap().is_empty());

    // A second pass is a no-op and seeds never duplicate.
    let again = schema::create_missing_tables(&db, &BTreeSet::new()).await;
    assert!(again.is_complete());

    let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(roles, 2);
    let resources: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(resources, 4);

    db.close().await;
    server.close().await;
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn missing_database_is_surfaced_distinctly() {
    let mut config = test_config();
    config.database = "clubconnect_definitely_absent".into();

    let err = connection::connect_database(&config)
        .await
        .expect_err("database must not exist");
    assert!(err.is_unknown_database(), "got: {err}");
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn csv_round_trip_preserves_rows_and_tolerates_short_rows() {
    let config = test_config();
    let db = ensure_ready(&config).await;
    let dir = tempfile::tempdir().unwrap();

    let out = dir.path().join("roles.csv");
    let exported = bulk::export_csv(&db, "roles", &out).await.unwrap();
    assert_eq!(exported, 2);

    sqlx::query("TRUNCATE TABLE roles")
        .execute(&db)
        .await
        .unwrap();

    let imported = bulk::import_csv(&db, "roles", &out).await.unwrap();
    assert_eq!(imported, exported);

    let admin: String =
        sqlx::query_scalar("SELECT Role_Name FROM roles WHERE Role_ID = 1")
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(admin, "admin");

    // A short row imports with NULL padding and does not abort the file.
    sqlx::query("TRUNCATE TABLE roles")
        .execute(&db)
        .await
        .unwrap();
    let short = dir.path().join("roles_short.csv");
    std::fs::write(
        &short,
        "Role_ID,Role_Name,Description,Created_Date\n7,treasurer\n8,secretary,Minutes and records,2025-11-06 08:02:59\n",
    )
    .unwrap();

    let imported = bulk::import_csv(&db, "roles", &short).await.unwrap();
    assert_eq!(imported, 2);

    let description: Option<String> =
        sqlx::query_scalar("SELECT Description FROM roles WHERE Role_ID = 7")
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(description, None);

    db.close().await;
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn sql_dump_with_one_bad_statement_executes_the_rest() {
    let config = test_config();
    let db = ensure_ready(&config).await;
    let dir = tempfile::tempdir().unwrap();

    let dump = dir.path().join("forum.sql");
    std::fs::write(
        &dump,
        "-- forum fixture\n\
         DELETE FROM discussion_forum;\n\
         INSERT INTO discussion_forum (Discussion_ID, Title, Message) VALUES (1, 'Welcome', 'hello');\n\
         THIS IS NOT SQL AT ALL;\n\
         INSERT INTO discussion_forum (Discussion_ID, Title, Message) VALUES (2, 'Rules', 'be kind');\n",
    )
    .unwrap();

    let report = bulk::import_sql_dump(&db, &dump).await.unwrap();
    assert_eq!(report.executed, 3);
    assert_eq!(report.failed, 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM discussion_forum")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(count, 2);

    db.close().await;
}
