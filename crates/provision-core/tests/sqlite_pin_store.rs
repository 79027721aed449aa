use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use provision_core::models::{CoreErrorKind, PinKind, PinRecord, PinState, Version};
use provision_core::persistence::{MigrationStore, PinStore};
use provision_core::pinning::{PinEvaluator, RecordPinEvaluator};
use provision_core::sqlite::{SqlitePinStore, current_schema_version, migration, migrations};

fn temp_db_path(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("provision-{test_name}-{nanos}.sqlite3"))
}

fn migrated_store(test_name: &str) -> SqlitePinStore {
    let store = SqlitePinStore::new(temp_db_path(test_name));
    store.migrate_to_latest().expect("migrations should apply");
    store
}

fn record(package_id: &str, kind: PinKind) -> PinRecord {
    let mut record = PinRecord::new(package_id, kind);
    record.created_at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    record
}

#[test]
fn migration_versions_are_contiguous_and_named() {
    let all = migrations();
    assert!(!all.is_empty());
    for (index, entry) in all.iter().enumerate() {
        assert_eq!(entry.version, index as i64 + 1);
        assert!(!entry.name.is_empty());
        assert!(!entry.up_sql.trim().is_empty());
        assert!(!entry.down_sql.trim().is_empty());
    }
    assert_eq!(current_schema_version(), all.len() as i64);
    assert!(migration(current_schema_version() + 1).is_none());
}

#[test]
fn planned_migrations_start_after_current_version() {
    let store = SqlitePinStore::new(temp_db_path("planned"));
    let planned: Vec<i64> = store
        .planned_migrations(1)
        .into_iter()
        .map(|entry| entry.version)
        .collect();
    assert_eq!(planned, (2..=current_schema_version()).collect::<Vec<_>>());
}

#[test]
fn migrate_up_and_down_tracks_version() {
    let store = SqlitePinStore::new(temp_db_path("migrate-up-down"));
    assert_eq!(store.current_version().unwrap(), 0);

    store.migrate_to_latest().unwrap();
    assert_eq!(store.current_version().unwrap(), current_schema_version());

    store.migrate_to_latest().unwrap();
    assert_eq!(store.current_version().unwrap(), current_schema_version());

    store.apply_migration(0).unwrap();
    assert_eq!(store.current_version().unwrap(), 0);
    let error = store.list_pins().unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::StorageFailure);
}

#[test]
fn invalid_migration_target_is_rejected() {
    let store = SqlitePinStore::new(temp_db_path("invalid-target"));

    let error = store
        .apply_migration(current_schema_version() + 1)
        .unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::StorageFailure);
    assert!(error.message.contains("apply_migration"));
}

#[test]
fn pin_operations_require_schema() {
    let store = SqlitePinStore::new(temp_db_path("no-schema"));

    let error = store
        .upsert_pin(&record("Contoso.App", PinKind::Pinning))
        .unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::StorageFailure);
    assert!(error.message.contains("upsert_pin"));
}

#[test]
fn pins_round_trip_and_replace_by_package_id() {
    let store = migrated_store("round-trip");
    let gated = record(
        "Contoso.Gated",
        PinKind::Gating {
            gated_version: Version::new("1.2"),
        },
    );
    let mut blocked = record("Contoso.Blocked", PinKind::Blocking);
    blocked.source_id = Some("community".to_string());

    store.upsert_pin(&gated).unwrap();
    store.upsert_pin(&blocked).unwrap();
    assert_eq!(store.get_pin("Contoso.Gated").unwrap(), Some(gated.clone()));
    assert_eq!(store.list_pins().unwrap(), vec![blocked.clone(), gated]);

    let replaced = record("contoso.gated", PinKind::Pinning);
    store.upsert_pin(&replaced).unwrap();
    let pins = store.list_pins().unwrap();
    assert_eq!(pins.len(), 2);
    assert_eq!(
        store.get_pin("CONTOSO.GATED").unwrap().map(|pin| pin.kind),
        Some(PinKind::Pinning)
    );

    store.remove_pin("contoso.blocked").unwrap();
    assert_eq!(store.get_pin("Contoso.Blocked").unwrap(), None);
    assert_eq!(store.list_pins().unwrap().len(), 1);
}

#[test]
fn empty_package_id_is_invalid_input() {
    let store = migrated_store("empty-id");

    let error = store.upsert_pin(&record("  ", PinKind::Pinning)).unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
}

#[test]
fn evaluator_loads_pins_from_store() {
    let store = migrated_store("evaluator");
    store
        .upsert_pin(&record(
            "Contoso.Gated",
            PinKind::Gating {
                gated_version: Version::new("1.2"),
            },
        ))
        .unwrap();
    store
        .upsert_pin(&record("Contoso.Blocked", PinKind::Blocking))
        .unwrap();

    let evaluator = RecordPinEvaluator::from_store(&store).unwrap();

    assert_eq!(
        evaluator.evaluate("contoso.gated", &Version::new("1.2.7")),
        PinState::Unpinned
    );
    assert_eq!(
        evaluator.evaluate("Contoso.Gated", &Version::new("1.3")),
        PinState::PinnedByUser
    );
    assert_eq!(
        evaluator.evaluate("Contoso.Blocked", &Version::new("9.0")),
        PinState::PinnedBlocking
    );
    assert_eq!(
        evaluator.evaluate("Contoso.Other", &Version::new("1.0")),
        PinState::Unpinned
    );
}
