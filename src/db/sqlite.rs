use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Embedded migrations, applied in order. Each script records its own
/// version in `schema_version`.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../resources/migrations/001_push_subscriptions.sql")),
    (2, include_str!("../../resources/migrations/002_subscription_role.sql")),
];

/// Latest schema version known to this build.
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DatabaseError::ConstraintViolation(format!(
                "Cannot create database directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations. Returns the schema version afterwards.
pub fn run_migrations(conn: &Connection) -> Result<i64, DatabaseError> {
    let current_version = get_current_version(conn);

    for &(version, sql) in MIGRATIONS {
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(get_current_version(conn))
}

/// Get the current schema version (0 if no schema exists yet)
pub fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

/// Whether a column exists on a table (used to verify migrations).
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_current_version(&conn), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again: should not error
        let version = run_migrations(&conn).unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn fresh_connection_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_current_version(&conn), 0);
    }

    #[test]
    fn role_migration_backfills_existing_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        assert!(!column_exists(&conn, "push_subscriptions", "role").unwrap());
        conn.execute(
            "INSERT INTO push_subscriptions (endpoint, keys) VALUES ('https://push.example/a', '{}')",
            [],
        )
        .unwrap();

        let version = run_migrations(&conn).unwrap();
        assert_eq!(version, 2);
        assert!(column_exists(&conn, "push_subscriptions", "role").unwrap());

        let role: String = conn
            .query_row(
                "SELECT role FROM push_subscriptions WHERE endpoint = 'https://push.example/a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(role, "admin");
    }

    #[test]
    fn role_index_created() {
        let conn = open_memory_database().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_push_subscriptions_role'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn open_database_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("bizdocs.db");
        let conn = open_database(&path).unwrap();
        assert!(path.exists());
        assert_eq!(get_current_version(&conn), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
