//! Integration tests for the rowmap-sqlite crate.

use chrono::{TimeZone, Utc};
use rowmap_core::{
    Command, CommandKind, Error, Filter, Payload, Query, Row, Session, SyncOutcome, Timestamp,
    Value, impl_record, query_count, query_text,
};
use rowmap_sqlite::{Connection, SqliteConfig, SqliteError};

const TABLE: &str = "testmodel";

#[derive(Debug, Default, Clone, PartialEq)]
struct DataModel {
    id: String,
    title: String,
    data_dec: f64,
    data_group: String,
    created: Timestamp,
    active: bool,
    counter: i64,
    scratch: String,
}

impl_record!(DataModel {
    id: String,
    title: String,
    data_dec: f64,
    data_group: String => "dg",
    created: Timestamp,
    active: bool,
    counter: i64,
    scratch: String => "-",
});

/// Creates a model whose fields all derive from `i`.
fn model(i: usize) -> DataModel {
    DataModel {
        id: format!("id_{i:04}"),
        title: format!("Title {i}"),
        data_dec: i as f64 + 0.25,
        data_group: if i % 2 == 0 { "QA" } else { "QD" }.to_string(),
        created: Utc.with_ymd_and_hms(2019, 11, 15, 7, 48, 34).unwrap(),
        active: i % 3 == 0,
        counter: i as i64,
        scratch: String::new(),
    }
}

/// Opens an in-memory connection with the test table synchronized.
fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap();
    conn
}

fn insert(conn: &Connection, data: &DataModel) {
    conn.execute(&Query::table(TABLE).insert(), Payload::data(data))
        .unwrap();
}

fn count(conn: &Connection) -> usize {
    query_count(conn, &format!("SELECT count(*) AS Count FROM {TABLE}")).unwrap()
}

fn live_columns(conn: &Connection) -> Vec<String> {
    let (_, rows) = query_text(conn, &format!("PRAGMA table_info({TABLE})")).unwrap();
    rows.into_iter().map(|row| row[1].clone()).collect()
}

fn fetch_all(conn: &Connection, command: &Command) -> Vec<DataModel> {
    let mut cursor = conn.cursor(command);
    let mut out = Vec::new();
    cursor.fetch(&mut out, 0).unwrap();
    cursor.close();
    out
}

// ---------------------------------------------------------------------------
// Schema synchronization
// ---------------------------------------------------------------------------

#[test]
fn test_ensure_creates_then_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();

    let created = conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap();
    assert!(matches!(created, SyncOutcome::Created(sql) if sql.contains("id VARCHAR(200) NOT NULL PRIMARY KEY")));
    assert_eq!(
        live_columns(&conn),
        vec!["id", "title", "data_dec", "dg", "created", "active", "counter"]
    );

    for _ in 0..2 {
        let again = conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap();
        assert_eq!(again, SyncOutcome::Unchanged);
    }
}

#[test]
fn test_ensure_matches_table_name_case_insensitively() {
    let conn = setup();
    let outcome = conn.ensure_table::<DataModel>("TestModel", &["id"]).unwrap();
    assert_eq!(outcome, SyncOutcome::Unchanged);
}

#[test]
fn test_ensure_adds_missing_columns_keeping_rows() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute(
        &Command::sql(format!(
            "CREATE TABLE {TABLE} (id VARCHAR(200) NOT NULL PRIMARY KEY, title VARCHAR(200), legacy INT)"
        )),
        Payload::data(&Row::new()),
    )
    .unwrap();
    conn.execute(
        &Command::sql(format!("INSERT INTO {TABLE} VALUES ('E1', 'Kept', 7)")),
        Payload::data(&Row::new()),
    )
    .unwrap();

    let outcome = conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap();
    match outcome {
        SyncOutcome::Altered(sql) => {
            assert_eq!(sql.matches("ADD COLUMN").count(), 5);
            assert!(!sql.contains("legacy"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(live_columns(&conn).contains(&"legacy".to_string()));
    assert_eq!(count(&conn), 1);
    assert_eq!(
        conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap(),
        SyncOutcome::Unchanged
    );
}

#[test]
fn test_ensure_type_change_rebuilds_and_keeps_rows() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute(
        &Command::sql(format!(
            "CREATE TABLE {TABLE} (id VARCHAR(200) NOT NULL PRIMARY KEY, data_dec INT, dg VARCHAR(200))"
        )),
        Payload::data(&Row::new()),
    )
    .unwrap();
    for i in 0..3 {
        conn.execute(
            &Command::sql(format!("INSERT INTO {TABLE} VALUES ('E{i}', {i}, 'QA')")),
            Payload::data(&Row::new()),
        )
        .unwrap();
    }

    let outcome = conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap();
    assert!(matches!(outcome, SyncOutcome::Altered(sql) if sql.contains("RENAME TO")));
    assert_eq!(count(&conn), 3);

    let (columns, rows) = query_text(&conn, &format!("PRAGMA table_info({TABLE})")).unwrap();
    let type_idx = columns.iter().position(|c| c == "type").unwrap();
    let pk_idx = columns.iter().position(|c| c == "pk").unwrap();
    let data_dec = rows.iter().find(|r| r[1] == "data_dec").unwrap();
    assert_eq!(data_dec[type_idx], "REAL");
    let id = rows.iter().find(|r| r[1] == "id").unwrap();
    assert_eq!(id[pk_idx], "1");

    let loaded = fetch_all(&conn, &Query::table(TABLE).filter(Filter::eq("id", "E2")).select());
    assert_eq!(loaded[0].data_dec, 2.0);
    assert_eq!(loaded[0].data_group, "QA");

    assert_eq!(
        conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap(),
        SyncOutcome::Unchanged
    );
}

#[test]
fn test_drop_table() {
    let conn = setup();
    conn.drop_table(TABLE).unwrap();
    assert!(live_columns(&conn).is_empty());
    conn.drop_table(TABLE).unwrap();
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[test]
fn test_insert_and_fetch_round_trip() {
    let conn = setup();
    let expected = model(7);
    insert(&conn, &expected);

    let loaded = fetch_all(&conn, &Query::table(TABLE).select());
    assert_eq!(loaded, vec![expected]);
}

#[test]
fn test_excluded_field_is_not_persisted() {
    let conn = setup();
    let mut data = model(1);
    data.scratch = "transient".to_string();
    insert(&conn, &data);

    let loaded = fetch_all(&conn, &Query::table(TABLE).select());
    assert_eq!(loaded[0].scratch, "");
    assert!(!live_columns(&conn).contains(&"scratch".to_string()));
}

#[test]
fn test_save_inserts_then_updates() {
    let conn = setup();
    let mut data = model(1);
    let save = Query::table(TABLE).filter(Filter::eq("id", data.id.as_str())).save();

    let first = conn.execute(&save, Payload::data(&data)).unwrap();
    assert_eq!(first.kind, CommandKind::Insert);
    assert_eq!(count(&conn), 1);

    data.title = "Renamed".to_string();
    let second = conn.execute(&save, Payload::data(&data)).unwrap();
    assert_eq!(second.kind, CommandKind::Update);
    assert_eq!(second.affected, 1);
    assert_eq!(count(&conn), 1);

    let loaded = fetch_all(&conn, &Query::table(TABLE).select());
    assert_eq!(loaded[0].title, "Renamed");
}

#[test]
fn test_update_with_allow_list_touches_only_listed_fields() {
    let conn = setup();
    insert(&conn, &model(1));

    let mut changed = model(1);
    changed.title = "Changed".to_string();
    changed.counter = 999;
    let cmd = Query::table(TABLE)
        .filter(Filter::eq("id", "id_0001"))
        .update_fields(&["Title"]);
    let outcome = conn.execute(&cmd, Payload::data(&changed)).unwrap();
    assert!(outcome.sql.starts_with(&format!("UPDATE {TABLE} SET Title='Changed'")));

    let loaded = fetch_all(&conn, &Query::table(TABLE).select());
    assert_eq!(loaded[0].title, "Changed");
    assert_eq!(loaded[0].counter, 1);
}

#[test]
fn test_insert_generic_row() {
    let conn = setup();
    let row = Row::new()
        .with("id", "R1")
        .with("dg", "QX")
        .with("data_dec", 1.5)
        .with("active", true);
    conn.execute(&Query::table(TABLE).insert(), Payload::data(&row))
        .unwrap();

    let loaded = fetch_all(&conn, &Query::table(TABLE).select());
    assert_eq!(loaded[0].id, "R1");
    assert_eq!(loaded[0].data_group, "QX");
    assert_eq!(loaded[0].data_dec, 1.5);
    assert!(loaded[0].active);
    assert_eq!(loaded[0].title, "");
}

#[test]
fn test_delete_with_filter() {
    let conn = setup();
    for i in 0..4 {
        insert(&conn, &model(i));
    }
    let outcome = conn
        .execute(
            &Query::table(TABLE).filter(Filter::eq("dg", "QA")).delete(),
            Payload::none(),
        )
        .unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(count(&conn), 2);
}

#[test]
fn test_execution_error_carries_sql() {
    let conn = Connection::open_in_memory().unwrap();
    let err = conn
        .execute(&Query::table("missing").insert(), Payload::data(&model(1)))
        .unwrap_err();
    match err.core() {
        Some(Error::Execution { sql, .. }) => assert!(sql.starts_with("INSERT INTO missing (")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_write_without_data_is_validation_error() {
    let conn = setup();
    let err = conn
        .execute(&Query::table(TABLE).insert(), Payload::none())
        .unwrap_err();
    assert!(matches!(err.core(), Some(Error::Validation(_))));
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

#[test]
fn test_fetch_2500_rows_in_order() {
    let conn = setup();
    let tx = conn.begin_tx().unwrap();
    for i in 0..2500 {
        tx.execute(&Query::table(TABLE).insert(), Payload::data(&model(i)))
            .unwrap();
    }
    tx.commit().unwrap();

    let mut cursor = conn.cursor(&Query::table(TABLE).select());
    assert_eq!(cursor.count().unwrap(), 2500);
    let mut out: Vec<DataModel> = Vec::new();
    cursor.fetch(&mut out, 1000).unwrap();
    assert_eq!(out.len(), 2500);
    assert_eq!(out.capacity(), 2500);
    for (i, item) in out.iter().enumerate() {
        assert_eq!(item, &model(i));
    }
}

#[test]
fn test_fetch_empty_result_leaves_empty_destination() {
    let conn = setup();
    let mut cursor = conn.cursor(&Query::table(TABLE).select());
    let mut out = vec![model(1)];
    cursor.fetch(&mut out, 0).unwrap();
    assert!(out.is_empty());
    assert!(cursor.error().is_none());
}

#[test]
fn test_alias_column_matches_only_by_alias() {
    let conn = Connection::open_in_memory().unwrap();

    let by_alias = fetch_all(&conn, &Command::sql("SELECT 'QA' AS dg"));
    assert_eq!(by_alias[0].data_group, "QA");

    let by_name = fetch_all(&conn, &Command::sql("SELECT 'QA' AS datagroup"));
    assert_eq!(by_name[0].data_group, "");
}

#[test]
fn test_fetch_rows_infers_values() {
    let conn = setup();
    insert(&conn, &model(3));

    let mut cursor = conn.cursor(
        &Query::table(TABLE).select_fields(&["id", "data_dec", "dg", "created", "counter"]),
    );
    let mut rows: Vec<Row> = Vec::new();
    cursor.fetch(&mut rows, 0).unwrap();

    let row = &rows[0];
    assert_eq!(row.get("ID"), Some(&Value::from("id_0003")));
    assert_eq!(row.get("data_dec"), Some(&Value::Float(3.25)));
    assert_eq!(row.get("DG"), Some(&Value::from("QD")));
    assert_eq!(
        row.get("created"),
        Some(&Value::Timestamp(Utc.with_ymd_and_hms(2019, 11, 15, 7, 48, 34).unwrap()))
    );
    assert_eq!(row.get("counter"), Some(&Value::Float(3.0)));
}

#[test]
fn test_fetch_boxed_records_and_one_by_one() {
    let conn = setup();
    for i in 0..3 {
        insert(&conn, &model(i));
    }

    let mut cursor = conn.cursor(&Query::table(TABLE).select());
    let first: Option<Box<DataModel>> = cursor.fetch_one().unwrap();
    assert_eq!(first.unwrap().id, "id_0000");

    let mut rest: Vec<Box<DataModel>> = Vec::new();
    cursor.fetch(&mut rest, 0).unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[1].id, "id_0002");
    assert!(cursor.is_eof());
}

#[test]
fn test_cursor_count_uses_filter() {
    let conn = setup();
    for i in 0..5 {
        insert(&conn, &model(i));
    }
    let mut cursor = conn.cursor(&Query::table(TABLE).filter(Filter::eq("dg", "QA")).select());
    assert_eq!(cursor.count().unwrap(), 3);

    let mut raw = conn.cursor(&Command::sql(format!("SELECT id FROM {TABLE} WHERE counter > 2")));
    assert_eq!(raw.count().unwrap(), 2);
}

#[test]
fn test_cursor_on_write_command_is_sticky_validation_error() {
    let conn = setup();
    let mut cursor = conn.cursor(&Query::table(TABLE).delete());
    assert!(matches!(cursor.error(), Some(Error::Validation(_))));

    let mut out: Vec<DataModel> = Vec::new();
    let err = cursor.fetch(&mut out, 0).unwrap_err();
    assert!(matches!(err.root(), Error::Validation(_)));
    assert!(cursor.count().is_err());
}

#[test]
fn test_cursor_query_failure_is_sticky() {
    let conn = Connection::open_in_memory().unwrap();
    let mut cursor = conn.cursor(&Query::table("missing").select());
    assert!(matches!(cursor.error(), Some(Error::Execution { .. })));
    let mut out: Vec<Row> = Vec::new();
    assert!(cursor.fetch(&mut out, 0).is_err());
}

#[test]
fn test_late_row_failure_is_sticky_iteration_error() {
    let conn = Connection::open_in_memory().unwrap();
    conn.run_script(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, n INTEGER);
         INSERT INTO t VALUES (1, 1), (2, 2), (3, -9223372036854775808);",
    )
    .unwrap();

    // abs() overflows on the third row only
    let select = Command::sql("SELECT abs(n) AS v FROM t");
    let mut cursor = conn.cursor(&select);
    assert!(cursor.error().is_none());

    let first: Option<Row> = cursor.fetch_one().unwrap();
    assert_eq!(first.unwrap().get("v"), Some(&Value::Float(1.0)));

    let mut rest: Vec<Row> = vec![Row::new().with("v", "untouched")];
    let err = cursor.fetch(&mut rest, 0).unwrap_err();
    assert!(matches!(err.root(), Error::Iteration(_)));
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].get("v"), Some(&Value::from("untouched")));

    assert!(matches!(cursor.error(), Some(Error::Iteration(_))));
    let again = cursor.fetch_one::<Row>().unwrap_err();
    assert!(matches!(again.root(), Error::Iteration(_)));
    assert!(cursor.count().is_err());

    let mut one_by_one = conn.cursor(&select);
    assert_eq!(one_by_one.fetch_one::<Row>().unwrap().unwrap().get("v"), Some(&Value::Float(1.0)));
    assert_eq!(one_by_one.fetch_one::<Row>().unwrap().unwrap().get("v"), Some(&Value::Float(2.0)));
    let err = one_by_one.fetch_one::<Row>().unwrap_err();
    assert!(matches!(err.root(), Error::Iteration(_)));
}

#[test]
fn test_coercion_failure_names_column() {
    let conn = Connection::open_in_memory().unwrap();
    let mut cursor = conn.cursor(&Command::sql("SELECT 'abc' AS data_dec"));
    let mut out: Vec<DataModel> = Vec::new();
    let err = cursor.fetch(&mut out, 0).unwrap_err();
    match err.root() {
        Error::Coercion { column, .. } => assert_eq!(column, "data_dec"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(cursor.error().is_some());
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[test]
fn test_rollback_discards_ten_rows() {
    let conn = setup();
    let tx = conn.begin_tx().unwrap();
    for i in 0..10 {
        tx.execute(&Query::table(TABLE).insert(), Payload::data(&model(i)))
            .unwrap();
    }
    let mut inside = tx.cursor(&Query::table(TABLE).select());
    assert_eq!(inside.count().unwrap(), 10);
    inside.close();
    tx.rollback().unwrap();

    assert_eq!(count(&conn), 0);
    assert!(!conn.is_tx());
}

#[test]
fn test_commit_keeps_ten_rows() {
    let conn = setup();
    let tx = conn.begin_tx().unwrap();
    for i in 0..10 {
        tx.execute(&Query::table(TABLE).insert(), Payload::data(&model(i)))
            .unwrap();
    }
    tx.commit().unwrap();
    assert_eq!(count(&conn), 10);
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let conn = setup();
    {
        let tx = conn.begin_tx().unwrap();
        tx.execute(&Query::table(TABLE).insert(), Payload::data(&model(1)))
            .unwrap();
    }
    assert_eq!(count(&conn), 0);
    assert!(conn.begin_tx().is_ok());
}

#[test]
fn test_double_begin_is_state_error() {
    let conn = setup();
    let _tx = conn.begin_tx().unwrap();
    let err = conn.begin_tx().err().unwrap();
    assert!(matches!(err.core(), Some(Error::State(_))));
}

#[test]
fn test_save_inside_transaction() {
    let conn = setup();
    let tx = conn.begin_tx().unwrap();
    let data = model(4);
    let save = Query::table(TABLE).filter(Filter::eq("id", "id_0004")).save();
    assert_eq!(
        tx.execute(&save, Payload::data(&data)).unwrap().kind,
        CommandKind::Insert
    );
    assert_eq!(
        tx.execute(&save, Payload::data(&data)).unwrap().kind,
        CommandKind::Update
    );
    tx.commit().unwrap();
    assert_eq!(count(&conn), 1);
}

// ---------------------------------------------------------------------------
// Configuration and on-disk databases
// ---------------------------------------------------------------------------

#[test]
fn test_on_disk_database_from_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("rowmap.yml");
    let config = SqliteConfig::file(dir.path().join("records.db"))
        .with_pragma("journal_mode", "WAL")
        .with_pragma("foreign_keys", "ON");
    config.save(&config_path).unwrap();

    let loaded = SqliteConfig::load(&config_path).unwrap();
    assert_eq!(loaded, config);

    {
        let conn = Connection::open(&loaded).unwrap();
        conn.ensure_table::<DataModel>(TABLE, &["id"]).unwrap();
        insert(&conn, &model(1));
        conn.close().unwrap();
    }

    let reopened = Connection::open(&loaded).unwrap();
    assert_eq!(count(&reopened), 1);
    assert_eq!(
        reopened.ensure_table::<DataModel>(TABLE, &["id"]).unwrap(),
        SyncOutcome::Unchanged
    );
}

#[test]
fn test_text_capacity_drives_varchar_width() {
    let mut config = SqliteConfig::in_memory();
    config.mapper.text_capacity = 64;
    let conn = Connection::open(&config).unwrap();
    let outcome = conn.ensure_table::<DataModel>(TABLE, &[]).unwrap();
    assert!(matches!(outcome, SyncOutcome::Created(sql) if sql.contains("title VARCHAR(64)")));
}

#[test]
fn test_invalid_pragma_is_rejected() {
    let config = SqliteConfig::in_memory().with_pragma("cache_size", "1; DROP TABLE x");
    assert!(matches!(
        Connection::open(&config),
        Err(SqliteError::InvalidPragma(_))
    ));
}
