#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SqliteMigration {
    pub version: i64,
    pub name: &'static str,
    pub up_sql: &'static str,
    pub down_sql: &'static str,
}

const MIGRATION_0001: SqliteMigration = SqliteMigration {
    version: 1,
    name: "initial_pin_schema",
    up_sql: r#"
CREATE TABLE IF NOT EXISTS pin_records (
    package_id TEXT NOT NULL COLLATE NOCASE PRIMARY KEY,
    source_id TEXT,
    pin_kind TEXT NOT NULL,
    gated_version TEXT,
    created_at_unix INTEGER NOT NULL
);
"#,
    down_sql: r#"
DROP TABLE IF EXISTS pin_records;
"#,
};

const MIGRATION_0002: SqliteMigration = SqliteMigration {
    version: 2,
    name: "index_pins_by_source",
    up_sql: r#"
CREATE INDEX IF NOT EXISTS idx_pin_records_source
    ON pin_records (source_id, package_id);
"#,
    down_sql: r#"
DROP INDEX IF EXISTS idx_pin_records_source;
"#,
};

const MIGRATIONS: [SqliteMigration; 2] = [MIGRATION_0001, MIGRATION_0002];

pub fn migrations() -> &'static [SqliteMigration] {
    &MIGRATIONS
}

pub fn migration(version: i64) -> Option<&'static SqliteMigration> {
    MIGRATIONS.iter().find(|entry| entry.version == version)
}

pub fn current_schema_version() -> i64 {
    MIGRATIONS.last().map(|entry| entry.version).unwrap_or(0)
}
