//! Database schema and migrations for the history store
//!
//! Two tables: `commands` interns distinct command texts, `executions`
//! records each run with its context. Indexed on the execution columns the
//! search engine filters on.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize or migrate the database schema. Idempotent; safe to run on
/// every daemon start.
pub fn init_schema(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// V1: command interning table plus the execution log
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS commands (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cmd_text TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS executions (
            id INTEGER PRIMARY KEY,
            command_id INTEGER NOT NULL,
            session_id TEXT NOT NULL,
            cwd TEXT NOT NULL,
            git_branch TEXT,
            exit_code INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            FOREIGN KEY (command_id) REFERENCES commands (id)
        );

        CREATE INDEX IF NOT EXISTS idx_exec_cwd ON executions(cwd);
        CREATE INDEX IF NOT EXISTS idx_exec_branch ON executions(git_branch);
        CREATE INDEX IF NOT EXISTS idx_exec_exit ON executions(exit_code);
        CREATE INDEX IF NOT EXISTS idx_exec_ts ON executions(timestamp);",
    )?;

    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}
