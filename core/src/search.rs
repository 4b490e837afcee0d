//! Context-scoped search over the execution history
//!
//! Static ranking rule: most-recently-executed first, deduplicated by
//! command text, capped at `SUGGEST_LIMIT`. The WHERE clause is composed
//! from fixed fragments keyed on the scope tag, with positional parameters
//! collected in lockstep.

use rusqlite::ToSql;
use tracing::debug;

use crate::error::Result;
use crate::protocol::Scope;
use crate::store::HistoryStore;

/// Maximum suggestions returned per query.
pub const SUGGEST_LIMIT: usize = 5;

/// Name of this tool's client binary. Commands invoking it are never
/// suggested back, or the tool would recommend re-running itself.
const CLIENT_BIN: &str = "recall";

/// One matched command, most recent distinct match first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: i64,
    pub text: String,
}

impl HistoryStore {
    /// Find past commands containing `query`, optionally restricted to a
    /// working directory or branch, optionally to successful runs only.
    ///
    /// Returns an empty vec (not an error) when nothing matches.
    pub fn search(&self, query: &str, scope: &Scope, only_success: bool) -> Result<Vec<SearchHit>> {
        let mut sql = format!(
            "SELECT c.id, c.cmd_text
             FROM executions e
             JOIN commands c ON e.command_id = c.id
             WHERE c.cmd_text LIKE ?
             AND c.cmd_text NOT LIKE '{CLIENT_BIN}%'
             AND c.cmd_text NOT LIKE './{CLIENT_BIN}%'
             AND TRIM(c.cmd_text) NOT LIKE '#%'"
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(format!("%{query}%"))];

        match scope {
            Scope::Global => {}
            Scope::Directory(dir) => {
                sql.push_str(" AND e.cwd = ?");
                params.push(Box::new(dir.clone()));
            }
            Scope::Branch(branch) => {
                sql.push_str(" AND e.git_branch = ?");
                params.push(Box::new(branch.clone()));
            }
        }

        if only_success {
            sql.push_str(" AND e.exit_code = 0");
        }

        sql.push_str(&format!(
            " GROUP BY c.cmd_text ORDER BY MAX(e.timestamp) DESC LIMIT {SUGGEST_LIMIT}"
        ));

        debug!("Search: {} with {} params", sql, params.len());

        // Only a handful of scope/success variants exist, so every shape
        // stays resident in the statement cache.
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let hits = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(SearchHit {
                    id: row.get(0)?,
                    text: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{memory_store, record};
    use crate::store::ExecutionRecord;

    fn texts(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.text.as_str()).collect()
    }

    #[test]
    fn test_most_recent_distinct_first() {
        let mut store = memory_store();
        store.record_execution(&record("ls -la", "/", 0, 1)).unwrap();
        store.record_execution(&record("ls -l", "/", 0, 2)).unwrap();
        store.record_execution(&record("ls -la", "/", 0, 3)).unwrap();

        let hits = store.search("ls", &Scope::Global, false).unwrap();
        assert_eq!(texts(&hits), vec!["ls -la", "ls -l"]);
    }

    #[test]
    fn test_directory_scope_filters_by_cwd() {
        let mut store = memory_store();
        store
            .record_execution(&record("make build", "/repo-a", 0, 1))
            .unwrap();
        store
            .record_execution(&record("make check", "/repo-b", 0, 2))
            .unwrap();

        let hits = store
            .search("make", &Scope::Directory("/repo-a".to_string()), false)
            .unwrap();
        assert_eq!(texts(&hits), vec!["make build"]);
    }

    #[test]
    fn test_branch_scope_filters_by_branch() {
        let mut store = memory_store();
        let mut on_main = record("deploy prod", "/repo", 0, 1);
        on_main.branch = Some("main".to_string());
        store.record_execution(&on_main).unwrap();

        let mut on_feature = record("deploy staging", "/repo", 0, 2);
        on_feature.branch = Some("feature/x".to_string());
        store.record_execution(&on_feature).unwrap();

        let hits = store
            .search("deploy", &Scope::Branch("main".to_string()), false)
            .unwrap();
        assert_eq!(texts(&hits), vec!["deploy prod"]);
    }

    #[test]
    fn test_only_success_uses_exit_zero_executions() {
        let mut store = memory_store();
        store.record_execution(&record("deploy", "/", 0, 1)).unwrap();
        store.record_execution(&record("deploy", "/", 1, 5)).unwrap();
        store.record_execution(&record("debug", "/", 0, 3)).unwrap();

        // With the failing t=5 run excluded, "deploy" ranks by its t=1
        // success and falls behind "debug".
        let hits = store.search("de", &Scope::Global, true).unwrap();
        assert_eq!(texts(&hits), vec!["debug", "deploy"]);

        let all = store.search("de", &Scope::Global, false).unwrap();
        assert_eq!(texts(&all), vec!["deploy", "debug"]);
    }

    #[test]
    fn test_self_invocations_and_comments_excluded() {
        let mut store = memory_store();
        store
            .record_execution(&record("recall suggest git", "/", 0, 1))
            .unwrap();
        store
            .record_execution(&record("./recall record --cmd x", "/", 0, 2))
            .unwrap();
        store
            .record_execution(&record("  # git push notes", "/", 0, 3))
            .unwrap();
        store
            .record_execution(&record("git push", "/", 0, 4))
            .unwrap();

        let hits = store.search("git", &Scope::Global, false).unwrap();
        assert_eq!(texts(&hits), vec!["git push"]);
    }

    #[test]
    fn test_results_capped_at_limit() {
        let mut store = memory_store();
        for i in 0..10 {
            store
                .record_execution(&record(&format!("task-{i}"), "/", 0, i))
                .unwrap();
        }

        let hits = store.search("task", &Scope::Global, false).unwrap();
        assert_eq!(hits.len(), SUGGEST_LIMIT);
        assert_eq!(hits[0].text, "task-9");
        assert_eq!(hits[4].text, "task-5");
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let mut store = memory_store();
        store.record_execution(&record("ls", "/", 0, 1)).unwrap();

        let hits = store.search("nonexistent", &Scope::Global, false).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_hits_carry_interned_command_id() {
        let mut store = memory_store();
        store.record_execution(&record("ls -la", "/", 0, 1)).unwrap();
        store.record_execution(&record("ls -la", "/", 0, 2)).unwrap();

        let hits = store.search("ls", &Scope::Global, false).unwrap();
        assert_eq!(hits.len(), 1);

        let id: i64 = store
            .conn
            .query_row(
                "SELECT id FROM commands WHERE cmd_text = 'ls -la'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits[0].id, id);
    }

    #[test]
    fn test_search_record_roundtrip_with_full_context() {
        let mut store = memory_store();
        let rec = ExecutionRecord {
            cmd: "cargo test --workspace".to_string(),
            session_id: "s-1".to_string(),
            cwd: "/repo".to_string(),
            branch: Some("main".to_string()),
            exit_code: 0,
            duration_ms: 1200,
            timestamp_ms: 42,
        };
        store.record_execution(&rec).unwrap();

        for scope in [
            Scope::Global,
            Scope::Directory("/repo".to_string()),
            Scope::Branch("main".to_string()),
        ] {
            let hits = store.search("cargo", &scope, true).unwrap();
            assert_eq!(texts(&hits), vec!["cargo test --workspace"]);
        }
    }
}
