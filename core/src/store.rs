//! History store: command interning plus the execution log
//!
//! One `HistoryStore` is opened per daemon process and lives for its whole
//! lifetime. All request handling is serialized by the daemon, so the store
//! never sees concurrent calls; the connection's statement cache gives the
//! hot insert/lookup statements prepare-once semantics without per-call SQL
//! parsing.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::schema;

/// Sized to hold the record statements plus every scoped search variant.
const STATEMENT_CACHE_CAPACITY: usize = 16;

/// One command execution to be recorded, with its full context.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub cmd: String,
    pub session_id: String,
    pub cwd: String,
    pub branch: Option<String>,
    pub exit_code: i32,
    pub duration_ms: i64,
    pub timestamp_ms: i64,
}

/// Durable, indexed storage of commands and executions.
pub struct HistoryStore {
    pub(crate) conn: Connection,
}

impl HistoryStore {
    /// Open (creating if needed) the history database at `path`.
    ///
    /// Schema init failure here is fatal to the caller: the daemon must not
    /// serve requests against a store with a missing or partial schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        schema::init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Record one execution: intern the command text, resolve its id, insert
    /// the execution row. Runs in a single transaction so a failure adds
    /// neither row pair half (an already-interned command may remain, which
    /// is harmless).
    ///
    /// Re-recording an existing command text never duplicates the commands
    /// row; it reuses the interned id.
    pub fn record_execution(&mut self, rec: &ExecutionRecord) -> Result<i64> {
        let tx = self.conn.transaction()?;

        let execution_id = {
            let mut insert_cmd =
                tx.prepare_cached("INSERT OR IGNORE INTO commands (cmd_text) VALUES (?)")?;
            insert_cmd.execute([rec.cmd.as_str()])?;

            let mut lookup_id = tx.prepare_cached("SELECT id FROM commands WHERE cmd_text = ?")?;
            let command_id: i64 = lookup_id.query_row([rec.cmd.as_str()], |row| row.get(0))?;

            let mut insert_exec = tx.prepare_cached(
                "INSERT INTO executions
                 (command_id, session_id, cwd, git_branch, exit_code, duration_ms, timestamp)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?;
            insert_exec.execute(params![
                command_id,
                rec.session_id,
                rec.cwd,
                rec.branch,
                rec.exit_code,
                rec.duration_ms,
                rec.timestamp_ms,
            ])?;
            tx.last_insert_rowid()
        };

        tx.commit()?;
        Ok(execution_id)
    }

    /// Number of distinct interned commands.
    pub fn command_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM commands", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of recorded executions.
    pub fn execution_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM executions", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn memory_store() -> HistoryStore {
        HistoryStore::open(Path::new(":memory:")).unwrap()
    }

    pub(crate) fn record(cmd: &str, cwd: &str, exit_code: i32, timestamp_ms: i64) -> ExecutionRecord {
        ExecutionRecord {
            cmd: cmd.to_string(),
            session_id: "test-session".to_string(),
            cwd: cwd.to_string(),
            branch: None,
            exit_code,
            duration_ms: 10,
            timestamp_ms,
        }
    }

    #[test]
    fn test_command_interning_is_idempotent() {
        let mut store = memory_store();
        for i in 0..4 {
            store
                .record_execution(&record("cargo build", "/repo", 0, i))
                .unwrap();
        }

        assert_eq!(store.command_count().unwrap(), 1);
        assert_eq!(store.execution_count().unwrap(), 4);
    }

    #[test]
    fn test_executions_reference_existing_commands() {
        let mut store = memory_store();
        store
            .record_execution(&record("ls -la", "/home", 0, 1))
            .unwrap();
        store
            .record_execution(&record("git log", "/repo", 0, 2))
            .unwrap();

        let orphans: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM executions e
                 LEFT JOIN commands c ON e.command_id = c.id
                 WHERE c.id IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_branch_is_nullable() {
        let mut store = memory_store();

        let mut with_branch = record("make", "/repo", 0, 1);
        with_branch.branch = Some("main".to_string());
        store.record_execution(&with_branch).unwrap();
        store.record_execution(&record("make", "/tmp", 0, 2)).unwrap();

        let null_branches: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM executions WHERE git_branch IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(null_branches, 1);
    }

    #[test]
    fn test_record_returns_distinct_execution_ids() {
        let mut store = memory_store();
        let a = store.record_execution(&record("ls", "/", 0, 1)).unwrap();
        let b = store.record_execution(&record("ls", "/", 0, 2)).unwrap();
        assert_ne!(a, b);
    }
}
