//! End-to-end behavior of a file-backed store across reopen cycles

use fieldstore::database::{MigrationPlan, Row, Stage, Store, StoreOptions, Value};
use fieldstore::MigrationLog;

fn tables() -> Vec<String> {
    vec!["CREATE TABLE IF NOT EXISTS T (Id INTEGER)".to_string()]
}

fn alterations(n: usize) -> Vec<String> {
    [
        "ALTER TABLE T ADD COLUMN Name TEXT",
        "ALTER TABLE T ADD COLUMN Zone TEXT",
        "ALTER TABLE T ADD COLUMN Area REAL",
    ][..n]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[tokio::test]
async fn fresh_database_records_alteration_count() {
    let store = Store::initialize(&StoreOptions::in_memory("fresh"), &tables(), &alterations(1))
        .await
        .unwrap();

    assert_eq!(store.migration_count().await.unwrap(), Some(1));
    assert_eq!(store.table_columns("T").await.unwrap(), vec!["Id", "Name"]);
    assert_eq!(store.app_versions().await.unwrap(), vec![1]);
}

#[tokio::test]
async fn insert_then_select_round() {
    let store = Store::initialize(&StoreOptions::in_memory("crud"), &tables(), &alterations(1))
        .await
        .unwrap();

    let id = store
        .insert_returning_id("INSERT INTO T (Name) VALUES (?)", &["Alice".into()], "addName")
        .await
        .unwrap();
    assert!(id > 0);

    let rows = store.select("SELECT Name FROM T", "listNames").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("Name"), Some(&Value::Text("Alice".into())));
}

#[tokio::test]
async fn reopen_is_idempotent_and_grows_monotonically() {
    let dir = tempfile::tempdir().unwrap();
    let options = StoreOptions::in_dir("survey.db", dir.path());

    let first = Store::initialize(&options, &tables(), &alterations(2))
        .await
        .unwrap();
    drop(first);

    // same inputs: nothing to do
    let store = Store::open(&options).unwrap();
    let report = store
        .bootstrap(&tables(), &MigrationLog::from_statements(alterations(2)))
        .await
        .unwrap();
    assert_eq!(report.plan, MigrationPlan::UpToDate { recorded: 2 });
    assert_eq!(store.app_versions().await.unwrap(), vec![1]);
    drop(store);

    // one more alteration: only the new entry is considered
    let store = Store::open(&options).unwrap().with_app_version(2);
    let report = store
        .bootstrap(&tables(), &MigrationLog::from_statements(alterations(3)))
        .await
        .unwrap();
    assert_eq!(report.plan, MigrationPlan::Incremental { from: 2, to: 3 });
    assert_eq!(report.applied, vec![3]);
    assert_eq!(store.migration_count().await.unwrap(), Some(3));
    assert_eq!(store.app_versions().await.unwrap(), vec![1, 2]);
    assert_eq!(
        store.table_columns("T").await.unwrap(),
        vec!["Id", "Name", "Zone", "Area"]
    );
}

#[tokio::test]
async fn bulk_insert_of_2500_rows() {
    let store = Store::initialize(&StoreOptions::in_memory("bulk"), &tables(), &alterations(1))
        .await
        .unwrap();
    let rows: Vec<Row> = (0..2500)
        .map(|i| Row::new().with("Id", i as i64).with("Name", format!("row {i}")))
        .collect();

    store
        .bulk_insert("INSERT INTO T (Id, Name)", &rows, "(?, ?)", "seedRows")
        .await
        .unwrap();
    assert_eq!(store.count_rows("T").await.unwrap(), 2500);
}

#[tokio::test]
async fn error_envelope_names_operation_and_stage() {
    let store = Store::initialize(&StoreOptions::in_memory("errors"), &tables(), &[])
        .await
        .unwrap();

    let err = store
        .select("SELECT * FROM Missing", "loadMissing")
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Execution));
    assert!(err.to_string().starts_with("loadMissing - execution-stage: "));

    let err = store
        .insert_returning_id("UPDATE T SET Id = 1 WHERE Id = -1", &[], "fakeInsert")
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Transform));
    assert!(err.to_string().starts_with("fakeInsert - transform-stage: "));
}

#[tokio::test]
async fn failed_table_schema_aborts_initialization() {
    let bad = vec![
        "CREATE TABLE IF NOT EXISTS T (Id INTEGER)".to_string(),
        "CREATE TABLE (".to_string(),
    ];
    let err = Store::initialize(&StoreOptions::in_memory("bad"), &bad, &alterations(1))
        .await
        .err()
        .unwrap();
    assert_eq!(err.operation(), Some("createTables"));
}
