//! Git branch resolution for execution context
//!
//! Absence of a branch is a normal outcome, not an error: callers omit the
//! branch context and move on.

use std::path::Path;
use std::process::{Command, Stdio};

/// Resolve the git branch active at `path`, searching upward like git does.
///
/// Returns `None` when the path is not inside a repository, HEAD is
/// detached, the repository is empty, or git itself is unavailable.
pub fn resolve_branch(path: &Path) -> Option<String> {
    Command::new("git")
        .args(["branch", "--show-current"])
        .current_dir(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            } else {
                None
            }
        })
}
