// Runs only when PGBRANCH_TEST_DATABASE_URL points at a disposable Postgres server
use pgbranch::config::PlatformConfig;
use pgbranch::store::{ExecutorConnector, PostgresConnector};
use pgbranch::{BranchOperations, Platform, ProjectOperations};
use serde_json::json;
use std::sync::Arc;

fn database_url() -> Option<String> {
    std::env::var("PGBRANCH_TEST_DATABASE_URL")
        .ok()
        .filter(|url| !url.is_empty())
}

#[tokio::test]
async fn test_postgres_executor_round_trip() {
    let Some(url) = database_url() else {
        println!("PGBRANCH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    let connector = PostgresConnector::new(&url).unwrap();
    let project_id = pgbranch::generate_id();
    let mut executor = connector.connect(&project_id).await.unwrap();

    executor
        .execute("create table items(id int, data bytea, meta jsonb)")
        .await
        .unwrap();
    executor
        .execute(r#"insert into items values (1, '\x0a0b', '{"a": 1}')"#)
        .await
        .unwrap();
    let rows = executor.execute("select id, data, meta from items").await.unwrap();
    assert_eq!(rows, vec![json!({"id": 1, "data": "\\x0a0b", "meta": {"a": 1}})]);

    executor.reset().await.unwrap();
    assert!(executor.execute("select * from items").await.is_err());

    executor.close().await.unwrap();
    println!("✓ Postgres executor runs, resets and closes a project schema");
}

#[tokio::test]
async fn test_postgres_branch_scenario() {
    let Some(url) = database_url() else {
        println!("PGBRANCH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    let platform = Platform::new(
        Arc::new(PostgresConnector::new(&url).unwrap()),
        PlatformConfig::default(),
    );
    let project = ProjectOperations::create_project(&platform, "pg-shop".to_string(), "default".to_string(), None);
    ProjectOperations::apply_migration(
        &platform,
        &project.id,
        "create_items".to_string(),
        "create table items(id int)".to_string(),
    )
    .await
    .unwrap();

    let branch = BranchOperations::create_branch(&platform, &project.id, "feature")
        .await
        .unwrap();
    platform.wait_for_background(&branch.id).await;
    ProjectOperations::execute_sql(&platform, &branch.project_ref, "select * from items")
        .await
        .unwrap();

    BranchOperations::delete_branch(&platform, &branch.id).await.unwrap();
}
