//! Database schema migrations for spacetrack.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: spaces, the ledger, and scoring reference data.
///
/// `log_entries.seq` keeps insertion order so entries sharing a
/// timestamp still list deterministically.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS spaces (
            id                    TEXT PRIMARY KEY,
            name                  TEXT NOT NULL,
            description           TEXT,
            goal                  TEXT,
            before_image          TEXT,
            after_image           TEXT,
            date_created          TEXT NOT NULL,
            date_modified         TEXT NOT NULL,
            total_clocked_in_time INTEGER NOT NULL DEFAULT 0,
            is_clocked_in         INTEGER NOT NULL DEFAULT 0,
            clock_in_start_time   TEXT
        );

        CREATE TABLE IF NOT EXISTS log_entries (
            seq                   INTEGER PRIMARY KEY AUTOINCREMENT,
            id                    TEXT NOT NULL UNIQUE,
            space_id              TEXT NOT NULL REFERENCES spaces(id),
            timestamp             TEXT NOT NULL,
            action_name           TEXT NOT NULL,
            points                INTEGER NOT NULL DEFAULT 0,
            kind                  TEXT NOT NULL,
            multi_step_action_id  TEXT,
            step_index            INTEGER,
            clock_in_time         TEXT,
            clock_out_time        TEXT,
            minutes_clocked_in    INTEGER
        );

        CREATE TABLE IF NOT EXISTS actions (
            id          TEXT PRIMARY KEY,
            space_id    TEXT NOT NULL REFERENCES spaces(id),
            name        TEXT NOT NULL,
            points      INTEGER NOT NULL,
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS multi_step_actions (
            id                 TEXT PRIMARY KEY,
            space_id           TEXT NOT NULL REFERENCES spaces(id),
            name               TEXT NOT NULL,
            points_per_step    INTEGER NOT NULL,
            steps              TEXT NOT NULL DEFAULT '[]',
            current_step_index INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS waste_entries (
            seq       INTEGER PRIMARY KEY AUTOINCREMENT,
            id        TEXT NOT NULL UNIQUE,
            space_id  TEXT NOT NULL REFERENCES spaces(id),
            timestamp TEXT NOT NULL,
            category  TEXT NOT NULL,
            points    INTEGER NOT NULL DEFAULT 0
        );",
    )?;
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    tx.commit()
}

/// Migration v2: to-dos and comments.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS todos (
            seq          INTEGER PRIMARY KEY AUTOINCREMENT,
            id           TEXT NOT NULL UNIQUE,
            space_id     TEXT NOT NULL REFERENCES spaces(id),
            text         TEXT NOT NULL,
            completed    INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS comments (
            seq       INTEGER PRIMARY KEY AUTOINCREMENT,
            id        TEXT NOT NULL UNIQUE,
            space_id  TEXT NOT NULL REFERENCES spaces(id),
            text      TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );",
    )?;
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
    tx.commit()
}

/// Migration v3: indexes for per-space history queries.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_log_space_timestamp ON log_entries(space_id, timestamp);
         CREATE INDEX IF NOT EXISTS idx_waste_space_timestamp ON waste_entries(space_id, timestamp);
         CREATE INDEX IF NOT EXISTS idx_actions_space ON actions(space_id);
         CREATE INDEX IF NOT EXISTS idx_msa_space ON multi_step_actions(space_id);",
    )?;
    set_schema_version(conn, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('spaces', 'log_entries', 'actions', 'multi_step_actions',
                  'waste_entries', 'todos', 'comments')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }
}
