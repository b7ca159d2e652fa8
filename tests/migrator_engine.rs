//! End-to-end behaviour of the migration engine on the in-memory store.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use waterline::migration::{
    BoxError, HistoryStore, MemoryDatabase, Migration, MigrationContext, MigrationError,
    MigrationLogger, Migrator,
};

type Entries = Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>;

fn capture_logger() -> (Entries, Arc<dyn MigrationLogger>) {
    let entries: Entries = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&entries);
    let logger = move |message: &str, fields: &[(&str, String)]| -> Result<(), BoxError> {
        let fields = fields
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();
        sink.lock()
            .map_err(|e| e.to_string())?
            .push((message.to_string(), fields));
        Ok(())
    };
    (entries, Arc::new(logger))
}

fn table_migration(version: u64, table: &'static str) -> Migration<MemoryDatabase> {
    Migration::new(version, format!("create_{table}"), move |_, db: &MemoryDatabase| {
        db.execute(format!("CREATE TABLE {table}"));
        Ok(())
    })
    .with_down(move |_, db: &MemoryDatabase| {
        db.execute(format!("DROP TABLE {table}"));
        Ok(())
    })
}

#[allow(clippy::expect_used)] // Test code - expect is acceptable
fn three_table_migrator() -> (Migrator<MemoryDatabase>, Arc<MemoryDatabase>) {
    let db = Arc::new(MemoryDatabase::new());
    let migrator = Migrator::with_migrations(
        Arc::clone(&db),
        [
            table_migration(2, "orders"),
            table_migration(1, "users"),
            table_migration(3, "payments"),
        ],
    )
    .expect("should register");
    (migrator, db)
}

#[test]
#[allow(clippy::expect_used)]
fn test_full_up_records_history_and_logs_each_step() {
    let (mut migrator, db) = three_table_migrator();
    let (entries, logger) = capture_logger();
    migrator.set_logger(logger);
    let ctx = MigrationContext::new();

    migrator.up(&ctx, 0).expect("up");

    let records = db.applied_records("migrations").expect("records");
    let versions: Vec<u64> = records.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert_eq!(records[2].description, "create_payments");
    assert_eq!(migrator.version(&ctx).expect("version"), (3, "create_payments".to_string()));

    let entries = entries.lock().expect("entries");
    assert_eq!(entries.len(), 3);
    for (index, (message, fields)) in entries.iter().enumerate() {
        assert_eq!(message, "applied migration");
        assert_eq!(fields[0], ("version".to_string(), (index + 1).to_string()));
        assert!(fields.iter().any(|(key, _)| key == "elapsed_ms"));
    }
}

#[test]
#[allow(clippy::expect_used)]
fn test_second_up_is_a_no_op() {
    let (migrator, db) = three_table_migrator();
    let ctx = MigrationContext::new();

    migrator.up(&ctx, 0).expect("first up");
    migrator.up(&ctx, 0).expect("second up");

    assert_eq!(db.statements().len(), 3);
    assert!(migrator.status(&ctx).expect("status").is_up_to_date());
}

#[test]
#[allow(clippy::expect_used)]
fn test_negative_n_means_all() {
    let (migrator, _db) = three_table_migrator();
    let ctx = MigrationContext::new();

    migrator.up(&ctx, -1).expect("up");
    assert_eq!(migrator.version(&ctx).expect("version").0, 3);

    migrator.down(&ctx, -5).expect("down");
    assert_eq!(migrator.version(&ctx).expect("version"), (0, String::new()));
}

#[test]
#[allow(clippy::expect_used)]
fn test_full_down_reverts_in_reverse_and_logs() {
    let (mut migrator, db) = three_table_migrator();
    let ctx = MigrationContext::new();
    migrator.up(&ctx, 0).expect("up");

    let (entries, logger) = capture_logger();
    migrator.set_logger(logger);
    migrator.down(&ctx, 0).expect("down");

    assert_eq!(
        db.statements()[3..],
        ["DROP TABLE payments", "DROP TABLE orders", "DROP TABLE users"]
    );
    let messages: Vec<String> = entries
        .lock()
        .expect("entries")
        .iter()
        .map(|(message, _)| message.clone())
        .collect();
    assert_eq!(messages, vec!["reverted migration"; 3]);
    assert!(db.applied_versions("migrations").expect("versions").is_empty());
}

#[test]
#[allow(clippy::expect_used)]
fn test_failed_down_stops_without_reapplying() {
    let db = Arc::new(MemoryDatabase::new());
    let mut migrator = Migrator::new();
    migrator.set_database(Arc::clone(&db));
    migrator.register(table_migration(1, "users")).expect("register 1");
    migrator
        .register(
            Migration::new(2, "stubborn", |_, _: &MemoryDatabase| Ok(()))
                .with_down(|_, _: &MemoryDatabase| Err("table is locked".into())),
        )
        .expect("register 2");
    migrator.register(table_migration(3, "payments")).expect("register 3");
    let ctx = MigrationContext::new();
    migrator.up(&ctx, 0).expect("up");

    let err = migrator.down(&ctx, 0).expect_err("down should fail at version 2");
    assert_eq!(err.version(), Some(2));
    assert!(err.to_string().contains("table is locked"));

    assert_eq!(db.applied_versions("migrations").expect("versions"), vec![1, 2]);
    assert_eq!(migrator.version(&ctx).expect("version"), (2, "stubborn".to_string()));
}

#[test]
#[allow(clippy::expect_used)]
fn test_expired_deadline_runs_nothing() {
    let (migrator, db) = three_table_migrator();
    let ctx = MigrationContext::with_deadline(Instant::now() - Duration::from_millis(1));

    match migrator.up(&ctx, 0) {
        Err(MigrationError::DeadlineExceeded { version }) => assert_eq!(version, 1),
        other => panic!("Expected DeadlineExceeded, got {other:?}"),
    }
    assert!(db.statements().is_empty());

    let fresh = MigrationContext::with_timeout(Duration::from_secs(60));
    migrator.up(&fresh, 0).expect("up with time left");
    assert_eq!(migrator.version(&fresh).expect("version").0, 3);
}

#[test]
#[allow(clippy::expect_used)]
fn test_status_lists_pending_with_reversibility() {
    let (mut migrator, _db) = three_table_migrator();
    migrator
        .register(Migration::new(4, "seed", |_, _: &MemoryDatabase| Ok(())))
        .expect("register 4");
    let ctx = MigrationContext::new();
    migrator.up(&ctx, 2).expect("up");

    let status = migrator.status(&ctx).expect("status");
    assert_eq!(status.applied_count, 2);
    assert_eq!(status.pending_count, 2);
    assert_eq!(status.total, 4);
    assert_eq!(status.latest_applied_version(), Some(2));
    let pending: Vec<(u64, bool)> = status.pending.iter().map(|p| (p.version, p.reversible)).collect();
    assert_eq!(pending, vec![(3, true), (4, false)]);
}

#[test]
#[allow(clippy::expect_used)]
fn test_register_source_with_path_identifiers() {
    let mut migrator: Migrator<MemoryDatabase> = Migrator::new();
    migrator
        .register_source(
            "db/migrations/10_add_index.sql",
            |_: &MigrationContext, db: &MemoryDatabase| {
                db.execute("CREATE INDEX");
                Ok(())
            },
            Some(|_: &MigrationContext, db: &MemoryDatabase| {
                db.execute("DROP INDEX");
                Ok(())
            }),
        )
        .expect("register");

    let err = migrator
        .register(Migration::new(10, "clash", |_, _: &MemoryDatabase| Ok(())))
        .expect_err("duplicate version");
    assert!(matches!(err, MigrationError::DuplicateVersion { version: 10, .. }));

    let listed = migrator.registered_migrations();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].description(), "add_index");
    assert!(listed[0].is_reversible());
}
