//! Versioned schema migrations.

use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

const MIGRATIONS: [(i64, &str); 1] = [(1, include_str!("../../migrations/001_initial.sql"))];

pub(crate) fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = current_version(conn);

    for (version, sql) in MIGRATIONS {
        if version > current_version {
            info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Current schema version, 0 for an empty database.
pub fn current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        configure_pragmas(&conn).unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_schema_version_is_current() {
        let conn = fresh();
        assert_eq!(current_version(&conn), 1);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = fresh();
        assert!(run_migrations(&conn).is_ok());
    }

    #[test]
    fn test_default_categories_seeded() {
        let conn = fresh();
        let parents: i64 = conn
            .query_row("SELECT COUNT(*) FROM categories WHERE parent_id IS NULL", [], |row| row.get(0))
            .unwrap();
        assert_eq!(parents, 10);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = fresh();
        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(fk, 1);
    }
}
