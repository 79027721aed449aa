use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{CoreError, CoreErrorKind, PinKind, PinRecord, Version};
use crate::persistence::{MigrationStore, PersistenceResult, PinStore};
use crate::sqlite::migrations::{SqliteMigration, current_schema_version, migration, migrations};

const MIGRATIONS_TABLE: &str = "provision_schema_migrations";

pub struct SqlitePinStore {
    database_path: PathBuf,
}

impl SqlitePinStore {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn planned_migrations(&self, from_version: i64) -> Vec<&'static SqliteMigration> {
        migrations()
            .iter()
            .filter(|entry| entry.version > from_version)
            .collect()
    }

    pub fn migrate_to_latest(&self) -> PersistenceResult<()> {
        self.apply_migration(current_schema_version())
    }

    fn with_connection<T>(
        &self,
        operation_name: &str,
        operation: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> PersistenceResult<T> {
        let mut connection = open_connection(&self.database_path)
            .map_err(|error| storage_error(operation_name, error))?;
        operation(&mut connection).map_err(|error| storage_error(operation_name, error))
    }
}

impl MigrationStore for SqlitePinStore {
    fn current_version(&self) -> PersistenceResult<i64> {
        self.with_connection("current_version", |connection| {
            ensure_migrations_table(connection)?;
            read_current_version(connection)
        })
    }

    fn apply_migration(&self, target_version: i64) -> PersistenceResult<()> {
        if target_version < 0 || target_version > current_schema_version() {
            return Err(storage_error_text(
                "apply_migration",
                format!("invalid migration target version '{target_version}'"),
            ));
        }

        self.with_connection("apply_migration", |connection| {
            ensure_migrations_table(connection)?;
            let current_version = read_current_version(connection)?;

            if target_version > current_version {
                for version in (current_version + 1)..=target_version {
                    apply_up_migration(connection, defined_migration(version)?)?;
                }
            } else {
                for version in ((target_version + 1)..=current_version).rev() {
                    apply_down_migration(connection, defined_migration(version)?)?;
                }
            }

            Ok(())
        })
    }
}

impl PinStore for SqlitePinStore {
    fn upsert_pin(&self, pin: &PinRecord) -> PersistenceResult<()> {
        if pin.package_id.trim().is_empty() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                "pin package id must not be empty",
            ));
        }

        self.with_connection("upsert_pin", |connection| {
            ensure_schema_ready(connection)?;
            let gated_version = match &pin.kind {
                PinKind::Gating { gated_version } => Some(gated_version.as_str()),
                _ => None,
            };
            connection.execute(
                "
INSERT INTO pin_records (
    package_id, source_id, pin_kind, gated_version, created_at_unix
) VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(package_id) DO UPDATE SET
    source_id = excluded.source_id,
    pin_kind = excluded.pin_kind,
    gated_version = excluded.gated_version,
    created_at_unix = excluded.created_at_unix
",
                params![
                    pin.package_id.as_str(),
                    pin.source_id.as_deref(),
                    pin.kind.as_str(),
                    gated_version,
                    to_unix_seconds(pin.created_at)?,
                ],
            )?;
            Ok(())
        })
    }

    fn remove_pin(&self, package_id: &str) -> PersistenceResult<()> {
        self.with_connection("remove_pin", |connection| {
            ensure_schema_ready(connection)?;
            connection.execute(
                "DELETE FROM pin_records WHERE package_id = ?1",
                params![package_id],
            )?;
            Ok(())
        })
    }

    fn get_pin(&self, package_id: &str) -> PersistenceResult<Option<PinRecord>> {
        self.with_connection("get_pin", |connection| {
            ensure_schema_ready(connection)?;
            connection
                .query_row(
                    "
SELECT package_id, source_id, pin_kind, gated_version, created_at_unix
FROM pin_records
WHERE package_id = ?1
",
                    params![package_id],
                    read_pin_row,
                )
                .optional()
        })
    }

    fn list_pins(&self) -> PersistenceResult<Vec<PinRecord>> {
        self.with_connection("list_pins", |connection| {
            ensure_schema_ready(connection)?;
            let mut statement = connection.prepare(
                "
SELECT package_id, source_id, pin_kind, gated_version, created_at_unix
FROM pin_records
ORDER BY package_id
",
            )?;
            let rows = statement.query_map([], read_pin_row)?;
            rows.collect()
        })
    }
}

fn read_pin_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PinRecord> {
    let package_id: String = row.get(0)?;
    let source_id: Option<String> = row.get(1)?;
    let pin_kind_raw: String = row.get(2)?;
    let gated_version: Option<String> = row.get(3)?;
    let created_at_unix: i64 = row.get(4)?;

    Ok(PinRecord {
        package_id,
        source_id,
        kind: parse_pin_kind(&pin_kind_raw, gated_version)?,
        created_at: from_unix_seconds(created_at_unix)?,
    })
}

fn open_connection(database_path: &Path) -> rusqlite::Result<Connection> {
    if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
    }
    Connection::open(database_path)
}

fn ensure_migrations_table(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&format!(
        "
CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at_unix INTEGER NOT NULL
);
"
    ))?;
    Ok(())
}

fn ensure_schema_ready(connection: &Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(connection)?;
    let version = read_current_version(connection)?;
    if version <= 0 {
        return Err(storage_error_sqlite(
            "database schema is not initialized; apply migrations before pin operations",
        ));
    }
    Ok(())
}

fn read_current_version(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {MIGRATIONS_TABLE}"),
        [],
        |row| row.get(0),
    )
}

fn defined_migration(version: i64) -> rusqlite::Result<&'static SqliteMigration> {
    migration(version).ok_or_else(|| {
        storage_error_sqlite(&format!("migration version '{version}' is not defined"))
    })
}

fn apply_up_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.up_sql)?;
    transaction.execute(
        &format!(
            "INSERT INTO {MIGRATIONS_TABLE} (version, name, applied_at_unix)
             VALUES (?1, ?2, strftime('%s', 'now'))"
        ),
        (migration.version, migration.name),
    )?;
    transaction.commit()?;
    Ok(())
}

fn apply_down_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.down_sql)?;
    transaction.execute(
        &format!("DELETE FROM {MIGRATIONS_TABLE} WHERE version = ?1"),
        [migration.version],
    )?;
    transaction.commit()?;
    Ok(())
}

fn parse_pin_kind(raw: &str, gated_version: Option<String>) -> rusqlite::Result<PinKind> {
    match (raw, gated_version) {
        ("pinning", _) => Ok(PinKind::Pinning),
        ("blocking", _) => Ok(PinKind::Blocking),
        ("gating", Some(gated_version)) => Ok(PinKind::Gating {
            gated_version: Version::new(gated_version),
        }),
        ("gating", None) => Err(storage_error_sqlite(
            "gating pin record is missing its gated version",
        )),
        _ => Err(storage_error_sqlite(&format!(
            "unknown pin kind '{raw}' in sqlite record"
        ))),
    }
}

fn to_unix_seconds(value: SystemTime) -> rusqlite::Result<i64> {
    let duration = value.duration_since(UNIX_EPOCH).map_err(|error| {
        storage_error_sqlite(&format!("time before unix epoch is not supported: {error}"))
    })?;
    i64::try_from(duration.as_secs())
        .map_err(|_| storage_error_sqlite("unix timestamp seconds exceed i64 range"))
}

fn from_unix_seconds(value: i64) -> rusqlite::Result<SystemTime> {
    let seconds = u64::try_from(value)
        .map_err(|_| storage_error_sqlite("negative unix timestamps are not supported"))?;
    Ok(UNIX_EPOCH + Duration::from_secs(seconds))
}

fn storage_error(operation: &str, error: rusqlite::Error) -> CoreError {
    storage_error_text(operation, error.to_string())
}

fn storage_error_sqlite(message: &str) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(message.to_string())))
}

fn storage_error_text(operation: &str, message: impl AsRef<str>) -> CoreError {
    CoreError::new(
        CoreErrorKind::StorageFailure,
        format!("sqlite pin store '{operation}' failed: {}", message.as_ref()),
    )
}
