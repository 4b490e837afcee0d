//! Request dispatch for the daemon
//!
//! Failures here never cross the socket: a failed search collapses to an
//! empty body, a failed record to a plain ack. Both are logged.

use std::path::Path;

use tracing::{debug, error};

use recall_core::protocol::{encode_suggestions, Request};
use recall_core::{git, ExecutionRecord};

use crate::DaemonState;

/// Handle one decoded request and produce the response body.
pub fn handle_request(req: Request, state: &DaemonState) -> Vec<u8> {
    match req {
        Request::Suggest {
            query,
            scope,
            only_success,
        } => {
            debug!("Suggest: {:?} (scope: {:?}, success: {})", query, scope, only_success);

            let texts: Vec<String> = match state.store.lock() {
                Ok(store) => match store.search(&query, &scope, only_success) {
                    Ok(hits) => hits.into_iter().map(|h| h.text).collect(),
                    Err(e) => {
                        error!("Search failed: {}", e);
                        Vec::new()
                    }
                },
                Err(_) => {
                    error!("Store mutex poisoned, returning no suggestions");
                    Vec::new()
                }
            };

            encode_suggestions(&texts)
        }

        Request::Record {
            cmd,
            session_id,
            cwd,
            exit_code,
            duration_ms,
        } => {
            debug!("Record: {:?} (cwd: {})", cmd, cwd);

            // The wire carries no branch; resolve it here, outside the
            // store lock, so a slow git lookup never blocks other requests.
            let branch = git::resolve_branch(Path::new(&cwd));
            let record = ExecutionRecord {
                cmd,
                session_id,
                cwd,
                branch,
                exit_code,
                duration_ms,
                timestamp_ms: chrono::Utc::now().timestamp_millis(),
            };

            match state.store.lock() {
                Ok(mut store) => match store.record_execution(&record) {
                    Ok(id) => {
                        debug!("Recorded execution {}", id);
                        state.increment_records();
                    }
                    // A lost history entry is acceptable; a dead daemon is not.
                    Err(e) => error!("Failed to record execution: {}", e),
                },
                Err(_) => error!("Store mutex poisoned, dropping execution"),
            }

            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::protocol::Scope;

    fn test_state(dir: &tempfile::TempDir) -> DaemonState {
        DaemonState::with_paths(
            &dir.path().join("history.db"),
            dir.path().join("recall.sock"),
        )
        .unwrap()
    }

    fn record_req(cmd: &str, exit_code: i32) -> Request {
        Request::Record {
            cmd: cmd.to_string(),
            session_id: "s-1".to_string(),
            cwd: "/repo".to_string(),
            exit_code,
            duration_ms: 5,
        }
    }

    #[test]
    fn test_record_then_suggest_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let ack = handle_request(record_req("cargo check", 0), &state);
        assert!(ack.is_empty());
        assert_eq!(state.records_count(), 1);

        let body = handle_request(
            Request::Suggest {
                query: "cargo".to_string(),
                scope: Scope::Global,
                only_success: false,
            },
            &state,
        );
        assert_eq!(body, b"cargo check");
    }

    #[test]
    fn test_suggest_respects_success_filter_through_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        handle_request(record_req("deploy prod", 1), &state);

        let body = handle_request(
            Request::Suggest {
                query: "deploy".to_string(),
                scope: Scope::Global,
                only_success: true,
            },
            &state,
        );
        assert!(body.is_empty());
    }

    #[test]
    fn test_suggest_response_is_newline_joined() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        handle_request(record_req("ls -la", 0), &state);
        handle_request(record_req("ls -l", 0), &state);

        let body = handle_request(
            Request::Suggest {
                query: "ls".to_string(),
                scope: Scope::Global,
                only_success: false,
            },
            &state,
        );
        let body = String::from_utf8(body).unwrap();
        assert_eq!(body.lines().count(), 2);
    }
}
