//! Ledger schema. Applied idempotently on every open.

pub(super) const CREATE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS migration_records (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    source_path   TEXT    NOT NULL,
    target_path   TEXT    NOT NULL,
    source_volume TEXT    NOT NULL,
    target_volume TEXT    NOT NULL,
    size          INTEGER NOT NULL,
    is_directory  INTEGER NOT NULL,
    migrated_at   TEXT    NOT NULL,
    status        INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_migration_records_source_volume ON migration_records(source_volume);
CREATE INDEX IF NOT EXISTS idx_migration_records_target_volume ON migration_records(target_volume);
CREATE INDEX IF NOT EXISTS idx_migration_records_status ON migration_records(status);
"#;

pub(super) const SELECT_COLUMNS: &str = "id, source_path, target_path, source_volume, target_volume, \
     size, is_directory, migrated_at, status";
