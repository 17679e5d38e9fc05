//! Cross-module behaviour of connection, transaction, triggers and drivers.

use proptest::prelude::*;
use std::sync::Arc;
use yana_db::{
    Config, Connection, ConnectionSnapshot, DbError, FileDbDriver, Query, RowSelector, Schema,
    SessionContext, Value, Where,
};
use yana_storage::{FileBackend, InMemoryBackend};
use yana_testkit::prelude::*;

fn is_update(event: &DriverEvent) -> bool {
    matches!(event, DriverEvent::Query(Query::Update(_)))
}

#[test]
fn insert_then_update_sends_two_statements_in_order() {
    let mut t = TestConnection::new();
    t.insert("users.42", Value::map([("name", "Ann")])).unwrap();
    t.update("users.42.name", "Anna").unwrap();
    assert_eq!(t.transaction().map(|tx| tx.len()), Some(2));

    t.commit().unwrap();

    let writes = t.log.writes();
    assert_eq!(writes.len(), 2);
    assert!(matches!(&writes[0], Query::Insert(i) if i.row == RowSelector::Id("42".into())));
    assert!(matches!(&writes[1], Query::Update(u) if u.column.as_deref() == Some("NAME")));
    assert!(t.transaction().is_none());
    assert_eq!(t.select("users.42.name").unwrap(), Value::from("Anna"));
}

#[test]
fn after_insert_fires_before_the_update_is_sent() {
    let mut t = TestConnection::new();
    t.insert("users.42", Value::map([("name", "Ann")])).unwrap();
    t.update("users.42.name", "Anna").unwrap();
    t.commit().unwrap();

    let events = t.log.without_reads();
    let after_insert = events
        .iter()
        .position(|e| *e == DriverEvent::Trigger("after-insert users.42".into()))
        .unwrap();
    let update = events.iter().position(is_update).unwrap();
    let before_update = events
        .iter()
        .position(|e| *e == DriverEvent::Trigger("before-update users.42".into()))
        .unwrap();
    let begin = events.iter().position(|e| *e == DriverEvent::Begin).unwrap();

    assert!(before_update < begin, "before-triggers run while queueing");
    assert!(after_insert < update);
    assert_eq!(
        events[update + 1],
        DriverEvent::Trigger("after-update users.42".into())
    );
}

#[test]
fn array_sub_index_updates_accumulate() {
    let mut t = TestConnection::new();
    t.seed_user(1, "Ann");

    t.update("users.1.tags.k1", "a").unwrap();
    t.update("users.1.tags.k2", "b").unwrap();
    assert_eq!(
        t.pending("users.1.tags").unwrap(),
        Some(Value::map([("k1", "a"), ("k2", "b")]))
    );

    t.commit().unwrap();
    assert_eq!(
        t.select("users.1.tags").unwrap(),
        Value::map([("k1", "a"), ("k2", "b")])
    );
    assert_eq!(t.select("users.1.tags.k2").unwrap(), Value::from("b"));
}

/// Keeps the last write per path and drops paths nested in another one.
fn prefix_free(writes: Vec<(Vec<String>, Value)>) -> Vec<(Vec<String>, Value)> {
    let mut kept: Vec<(Vec<String>, Value)> = Vec::new();
    for (path, value) in writes {
        let clashes = kept.iter().any(|(other, _)| {
            other != &path && (other.starts_with(&path) || path.starts_with(other))
        });
        if clashes {
            continue;
        }
        kept.retain(|(other, _)| other != &path);
        kept.push((path, value));
    }
    kept
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn array_writes_accumulate_for_any_paths(
        writes in prop::collection::vec((array_path_strategy(), scalar_value_strategy()), 1..8)
    ) {
        let writes = prefix_free(writes);
        let mut t = TestConnection::new();
        t.seed_user(1, "Ann");

        for (path, value) in &writes {
            t.update(&format!("users.1.tags.{}", path.join(".")), value.clone()).unwrap();
        }

        let cell = t.pending("users.1.tags").unwrap().unwrap();
        for (path, value) in &writes {
            prop_assert_eq!(cell.get_path(&path[..]), Some(value));
        }

        t.commit().unwrap();
        let stored = t.select("users.1.tags").unwrap();
        prop_assert_eq!(stored, cell);
    }
}

#[test]
fn insert_or_update_picks_the_right_statement() {
    let mut t = TestConnection::new();
    t.seed_user(1, "Ann");

    t.insert_or_update("users.1", Value::map([("name", "Anne")]))
        .unwrap();
    t.insert_or_update("users.2", Value::map([("name", "Bob")]))
        .unwrap();
    t.insert_or_update("users.2.mail", "bob@example.org").unwrap();
    t.commit().unwrap();

    let kinds: Vec<&str> = t
        .log
        .writes()
        .iter()
        .map(|q| match q {
            Query::Insert(_) => "insert",
            Query::Update(_) => "update",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["update", "insert", "update"]);

    assert!(matches!(
        t.insert_or_update("users.3.name", "x"),
        Err(DbError::InvalidArgument { .. })
    ));
    assert!(matches!(
        t.insert_or_update("users.*", Value::map([("name", "x")])),
        Err(DbError::InvalidArgument { .. })
    ));
}

#[test]
fn remove_never_exceeds_its_limit() {
    let mut t = TestConnection::new();
    for (id, name) in [(1, "Ann"), (2, "Bob"), (3, "Cy")] {
        t.seed_user(id, name);
    }

    t.remove("users").unwrap();
    t.commit().unwrap();
    assert_eq!(t.length("users").unwrap(), 2);

    t.remove_with("users", Some(Where::ne("name", "nobody")), 1)
        .unwrap();
    t.commit().unwrap();
    assert_eq!(t.length("users").unwrap(), 1);

    assert!(matches!(
        t.remove_with("users", None, 0),
        Err(DbError::InvalidArgument { .. })
    ));
    assert!(t.transaction().is_none());
}

#[test]
fn failed_statement_rolls_back_once_and_stops() {
    let mut t = TestConnection::with_driver(|schema, log| {
        RecordingDriver::new(schema, log).fail_statement(2)
    });
    t.insert("users.1", Value::map([("name", "Ann")])).unwrap();
    t.insert("users.2", Value::map([("name", "Bob")])).unwrap();
    t.insert("users.3", Value::map([("name", "Cy")])).unwrap();

    let err = t.commit().unwrap_err();
    match err {
        DbError::QueryFailed { message, .. } => assert_eq!(message, "injected failure"),
        other => panic!("unexpected error {other:?}"),
    }

    let events = t.log.without_reads();
    assert_eq!(t.log.count(|e| *e == DriverEvent::Rollback), 1);
    assert_eq!(t.log.count(|e| *e == DriverEvent::Commit), 0);
    assert_eq!(t.log.writes().len(), 1);
    assert!(!events
        .iter()
        .any(|e| *e == DriverEvent::Trigger("after-insert users.3".into())));

    assert!(t.transaction().is_none());
    assert!(t.write_cache().is_empty());
    assert_eq!(t.length("users").unwrap(), 0);
}

#[test]
fn failed_rollback_does_not_mask_the_error() {
    let mut t = TestConnection::with_driver(|schema, log| {
        RecordingDriver::new(schema, log)
            .fail_statement(1)
            .fail_rollback()
    });
    t.sql("UPDATE anything").unwrap();
    match t.commit() {
        Err(DbError::QueryFailed { statement, .. }) => assert_eq!(statement, "UPDATE anything"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn failed_commit_reports_commit_failed_and_resets() {
    let mut t = TestConnection::with_driver(|schema, log| RecordingDriver::new(schema, log).fail_commit());
    t.insert("users.1", Value::map([("name", "Ann")])).unwrap();
    assert!(matches!(t.commit(), Err(DbError::CommitFailed { .. })));
    assert!(t.transaction().is_none());
    assert!(t.write_cache().is_empty());
    assert_eq!(t.log.count(|e| *e == DriverEvent::Rollback), 1);
    assert_eq!(t.length("users").unwrap(), 0);
}

#[test]
fn unwritable_filedb_image_leaves_no_rows_behind() {
    let log = EventLog::new();
    let schema = sample_schema(&log);
    let backend = InMemoryBackend::new();
    let driver = FileDbDriver::open(Arc::clone(&schema), Box::new(backend.clone())).unwrap();
    let mut connection = Connection::new(schema, Box::new(driver));
    backend.close();

    connection.insert("users.1", Value::map([("name", "ghost")])).unwrap();
    assert!(matches!(connection.commit(), Err(DbError::CommitFailed { .. })));
    assert_eq!(connection.length("users").unwrap(), 0);
    assert_eq!(connection.select("users.1.name").unwrap(), Value::Null);
}

#[test]
fn constraint_violation_changes_nothing() {
    let mut t = TestConnection::new();
    t.update("users.1.name", "Ann").unwrap();

    assert!(matches!(
        t.update("users.1.age", -1),
        Err(DbError::ConstraintViolation { constraint, .. }) if constraint == "age_non_negative"
    ));
    assert!(matches!(
        t.update("users.1.mail", "not-an-address"),
        Err(DbError::ConstraintViolation { constraint, .. }) if constraint == "mail_has_at"
    ));
    assert!(matches!(
        t.insert("users.2", Value::map([("age", Value::from(-5))])),
        Err(DbError::ConstraintViolation { .. })
    ));

    assert_eq!(t.transaction().map(|tx| tx.len()), Some(1));
    assert_eq!(t.pending("users.1.age").unwrap(), None);
    assert_eq!(t.pending("users.2").unwrap(), None);
}

#[test]
fn read_only_targets_are_refused() {
    let mut t = TestConnection::new();
    assert!(matches!(
        t.update("users.1.created", 5),
        Err(DbError::NotWriteable { .. })
    ));
    assert!(matches!(
        t.insert("audit.1", Value::empty_map()),
        Err(DbError::NotWriteable { .. })
    ));

    let schema = Arc::new(Schema::new("frozen").readonly());
    let driver = FileDbDriver::in_memory(Arc::clone(&schema));
    let mut frozen = Connection::new(schema, Box::new(driver));
    assert!(!frozen.is_writeable());
    assert!(matches!(
        frozen.sql("DELETE"),
        Err(DbError::NotWriteable { .. })
    ));
}

#[test]
fn reset_after_rollback_commit_and_failure() {
    let mut t = TestConnection::new();
    t.insert("users.1", Value::map([("name", "Ann")])).unwrap();
    t.rollback();
    assert!(t.transaction().is_none());
    assert!(t.write_cache().is_empty());

    t.insert("users.1", Value::map([("name", "Ann")])).unwrap();
    t.commit().unwrap();
    assert!(t.transaction().is_none());
    assert!(t.write_cache().is_empty());

    t.insert("users.1", Value::map([("name", "again")])).unwrap();
    assert!(t.commit().is_err());
    assert!(t.transaction().is_none());
    assert!(t.write_cache().is_empty());

    t.log.clear();
    t.commit().unwrap();
    assert!(t.log.events().is_empty());
}

#[test]
fn other_users_later_edit_times_out() {
    let alice = TestConnection::new();
    let mut bob = TestConnection::for_user(&alice, "bob", 900);
    bob.clock.set(1_000);
    bob.update("users.1.name", "Bob").unwrap();

    let mut carol = TestConnection::for_user(&alice, "carol", 950);
    bob.clock.set(1_010);
    assert!(matches!(
        carol.update("users.1.name", "Carol"),
        Err(DbError::Timeout { table, row }) if table == "users" && row == "1"
    ));
    assert!(carol.transaction().map_or(true, |tx| tx.is_empty()));

    let mut dave = TestConnection::for_user(&alice, "dave", 2_000);
    dave.update("users.1.name", "Dave").unwrap();
}

#[test]
fn same_user_never_times_out() {
    let base = TestConnection::new();
    let mut bob = TestConnection::for_user(&base, "bob", 10);
    bob.clock.set(100);
    bob.update("users.1.name", "one").unwrap();
    bob.clock.set(200);
    bob.update("users.1.name", "two").unwrap();

    let mut bob_again = TestConnection::for_user(&base, "bob", 10);
    bob_again.update("users.1.name", "three").unwrap();
}

#[test]
fn guard_is_skipped_when_locking_is_off() {
    let base = TestConnection::new();
    let mut bob = TestConnection::for_user(&base, "bob", 10);
    bob.clock.set(100);
    bob.update("users.1.name", "one").unwrap();

    let snapshot = ConnectionSnapshot {
        schema: "sample".into(),
        session: SessionContext::new("carol").started_at(50),
        config: Config::new().strict_locking(false),
    };
    let log = EventLog::new();
    let schema = sample_schema(&log);
    let driver = RecordingDriver::new(Arc::clone(&schema), log);
    let mut carol = Connection::restore(snapshot, schema, Box::new(driver)).unwrap();
    carol.update("users.1.name", "two").unwrap();
}

#[test]
fn null_is_always_quoted_as_null() {
    let t = TestConnection::new();
    assert_eq!(t.quote(&Value::Null), "NULL");
    assert_eq!(t.quote(&Value::from(3)), "<3>");

    let schema = Arc::new(Schema::new("plain"));
    let filedb = Connection::new(Arc::clone(&schema), Box::new(FileDbDriver::in_memory(schema)));
    assert_eq!(filedb.quote(&Value::Null), "NULL");
}

#[test]
fn snapshot_round_trip_and_schema_check() {
    let base = TestConnection::new();
    let bob = TestConnection::for_user(&base, "bob", 77);
    let bytes = bob.snapshot().to_bytes().unwrap();
    let snapshot = ConnectionSnapshot::from_bytes(&bytes).unwrap();
    assert_eq!(snapshot.session.user, "bob");
    assert_eq!(snapshot.session.started_at, Some(77));
    assert!(snapshot.config.strict_locking);

    let log = EventLog::new();
    let schema = sample_schema(&log);
    let restored = Connection::restore(
        snapshot.clone(),
        Arc::clone(&schema),
        Box::new(RecordingDriver::new(Arc::clone(&schema), log)),
    )
    .unwrap();
    assert_eq!(restored.session(), bob.session());
    assert!(restored.transaction().is_none());

    let other = Arc::new(Schema::new("other"));
    assert!(matches!(
        Connection::restore(snapshot, Arc::clone(&other), Box::new(FileDbDriver::in_memory(other))),
        Err(DbError::InvalidArgument { .. })
    ));
}

#[test]
fn restore_keeps_the_whole_config() {
    let config = Config::new()
        .temp_dir("/var/lib/app/state")
        .last_modified_file("lm.bin")
        .default_remove_limit(5);
    let log = EventLog::new();
    let schema = sample_schema(&log);
    let original = Connection::builder(
        Arc::clone(&schema),
        Box::new(RecordingDriver::new(Arc::clone(&schema), log.clone())),
    )
    .config(config.clone())
    .build();

    let bytes = original.snapshot().to_bytes().unwrap();
    let snapshot = ConnectionSnapshot::from_bytes(&bytes).unwrap();
    let restored = Connection::restore(
        snapshot,
        Arc::clone(&schema),
        Box::new(RecordingDriver::new(Arc::clone(&schema), log)),
    )
    .unwrap();

    assert_eq!(restored.config(), &config);
    assert_eq!(
        restored.config().last_modified_path(),
        std::path::PathBuf::from("/var/lib/app/state/lm.bin")
    );
    assert_eq!(restored.config().default_remove_limit, 5);
}

#[test]
fn filedb_image_survives_reopen() {
    let (_dir, path) = temp_image_path();
    let log = EventLog::new();
    let schema = sample_schema(&log);

    {
        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        let driver = FileDbDriver::open(Arc::clone(&schema), Box::new(backend)).unwrap();
        let mut db = Connection::new(Arc::clone(&schema), Box::new(driver));
        db.insert("users", Value::map([("name", "Auto")])).unwrap();
        db.insert("users.10", Value::map([("name", "Ten")])).unwrap();
        db.commit().unwrap();
    }

    let backend = FileBackend::open(&path).unwrap();
    let driver = FileDbDriver::open(Arc::clone(&schema), Box::new(backend)).unwrap();
    let mut db = Connection::new(schema, Box::new(driver));
    assert_eq!(db.length("users").unwrap(), 2);
    assert_eq!(db.select("users.1.name").unwrap(), Value::from("Auto"));
    assert_eq!(db.select("users.10.name").unwrap(), Value::from("Ten"));
}

#[test]
fn failing_before_trigger_blocks_the_write() {
    let schema = Arc::new(
        Schema::new("guarded").with_table(
            yana_db::Table::new("locks", "id")
                .with_column(yana_db::Column::new("id", yana_db::ColumnType::Text))
                .on(yana_db::TriggerEvent::BeforeDelete, |_| {
                    Err(DbError::invalid_argument("locks cannot be removed"))
                }),
        ),
    );
    let driver = FileDbDriver::in_memory(Arc::clone(&schema));
    let mut db = Connection::new(schema, Box::new(driver));
    assert!(db.remove("locks.a").is_err());
    assert!(db.transaction().map_or(true, |tx| tx.is_empty()));
}
