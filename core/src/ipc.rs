//! IPC client transport for the one-shot `recall` binary
//!
//! Synchronous by design: the client sends one request, half-closes its
//! write side so the daemon sees end-of-stream, reads the whole response,
//! and exits. Absence of the daemon is distinguished from a failed connect
//! because the two map to different client exit codes.

use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::protocol::{encode_request, Request, MAX_REQUEST_BYTES};

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Well-known socket location. `RECALL_SOCKET` overrides it (tests, or
/// running several daemons side by side).
pub fn socket_path() -> PathBuf {
    std::env::var_os("RECALL_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("recall.sock"))
}

/// Error type for IPC operations
#[derive(Error, Debug)]
pub enum IpcError {
    /// No socket file exists; the daemon was never started. The client
    /// treats this as a graceful skip.
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("connection failed: {0}")]
    ConnectionFailed(std::io::Error),

    #[error("send failed: {0}")]
    SendFailed(std::io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(std::io::Error),
}

/// Send one request to the daemon at the well-known socket path and return
/// the raw response body (possibly empty).
pub fn send_request(req: &Request) -> Result<Vec<u8>, IpcError> {
    send_request_to(&socket_path(), req)
}

/// Send one request to the daemon at `path`.
pub fn send_request_to(path: &Path, req: &Request) -> Result<Vec<u8>, IpcError> {
    if !path.exists() {
        return Err(IpcError::DaemonNotRunning);
    }

    let mut stream = UnixStream::connect(path).map_err(IpcError::ConnectionFailed)?;
    stream.set_read_timeout(Some(IO_TIMEOUT)).ok();
    stream.set_write_timeout(Some(IO_TIMEOUT)).ok();

    stream
        .write_all(&encode_request(req))
        .map_err(IpcError::SendFailed)?;
    // Half-close so the daemon's read-to-end terminates.
    stream.shutdown(Shutdown::Write).map_err(IpcError::SendFailed)?;

    let mut response = Vec::new();
    stream
        .take(MAX_REQUEST_BYTES as u64)
        .read_to_end(&mut response)
        .map_err(IpcError::ReceiveFailed)?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Scope;

    #[test]
    fn test_default_socket_path() {
        // The override is process-global; only assert the default shape
        // when the variable is unset.
        if std::env::var_os("RECALL_SOCKET").is_none() {
            assert!(socket_path().ends_with("recall.sock"));
        }
    }

    #[test]
    fn test_missing_socket_is_daemon_not_running() {
        let req = Request::Suggest {
            query: "ls".to_string(),
            scope: Scope::Global,
            only_success: false,
        };
        let result = send_request_to(Path::new("/nonexistent/recall.sock"), &req);
        assert!(matches!(result, Err(IpcError::DaemonNotRunning)));
    }
}
