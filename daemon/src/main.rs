//! Recall Daemon (recalld)
//!
//! Long-running service that records every shell command (with working
//! directory, git branch, session, exit code, duration) and answers
//! context-scoped suggestion queries from the one-shot `recall` client.
//!
//! Architecture:
//! - Unix socket listener at $TMPDIR/recall.sock, one request per connection
//! - Delimiter-framed requests (see recall_core::protocol)
//! - Single SQLite store opened at startup; all access serialized through
//!   one mutex so the prepared-statement cache is never used concurrently

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

mod handlers;
mod server;

use recall_core::protocol::{self, MAX_REQUEST_BYTES, REQUEST_BUF_BYTES};
use recall_core::HistoryStore;

/// Global state for the daemon. Explicitly constructed once at startup and
/// shared with every connection task.
pub struct DaemonState {
    /// When the daemon started
    start_time: Instant,

    /// Executions recorded this session
    records_count: AtomicU64,

    /// Shutdown signal
    shutdown: AtomicBool,

    /// Path to the daemon socket
    socket_path: PathBuf,

    /// The single process-wide store handle. Request handling locks this
    /// for the duration of each store call and nothing longer.
    pub store: Mutex<HistoryStore>,
}

impl DaemonState {
    /// Create the daemon state with default paths: the store under
    /// `~/.recall` (or `RECALL_DATA_DIR`), the socket at the well-known
    /// location.
    ///
    /// # Errors
    /// Returns `anyhow::Error` if the data directory or store cannot be
    /// initialized. Fatal by design: the daemon must not serve requests
    /// against a store with a missing or partial schema.
    pub fn new() -> Result<Self> {
        let data_dir = std::env::var_os("RECALL_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".recall")))
            .unwrap_or_else(|| std::env::temp_dir().join(".recall"));

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        Self::with_paths(&data_dir.join("history.db"), recall_core::socket_path())
    }

    /// Create the daemon state with explicit store and socket paths.
    pub fn with_paths(db_path: &Path, socket_path: PathBuf) -> Result<Self> {
        let store = HistoryStore::open(db_path)
            .with_context(|| format!("failed to open history store {}", db_path.display()))?;

        info!(
            "History store ready at {} ({} commands, {} executions)",
            db_path.display(),
            store.command_count().unwrap_or(0),
            store.execution_count().unwrap_or(0),
        );

        Ok(Self {
            start_time: Instant::now(),
            records_count: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            socket_path,
            store: Mutex::new(store),
        })
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Number of executions recorded since startup.
    pub fn records_count(&self) -> u64 {
        self.records_count.load(Ordering::Relaxed)
    }

    /// Increment the in-session record counter.
    pub fn increment_records(&self) {
        self.records_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Check whether a shutdown has been requested.
    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Request a graceful shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Get the path to the daemon socket.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("recalld=info".parse()?),
        )
        .init();

    info!("Starting recalld v{}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(DaemonState::new()?);

    // Remove stale socket
    if state.socket_path().exists() {
        std::fs::remove_file(state.socket_path())?;
    }

    server::run(state).await
}

/// Handle a single client connection: read one request to end-of-stream,
/// dispatch, write the response, close.
///
/// Malformed requests drop the connection without a response and without
/// touching the store; the client treats zero bytes as "no suggestion".
async fn handle_connection(
    mut stream: tokio::net::UnixStream,
    state: Arc<DaemonState>,
) -> Result<()> {
    let mut buf = Vec::with_capacity(REQUEST_BUF_BYTES);
    (&mut stream)
        .take(MAX_REQUEST_BYTES as u64)
        .read_to_end(&mut buf)
        .await?;

    let request = match protocol::decode_request(&buf) {
        Ok(req) => req,
        Err(e) => {
            warn!("Dropping malformed request: {}", e);
            return Ok(());
        }
    };

    let response = handlers::handle_request(request, &state);
    stream.write_all(&response).await?;
    stream.shutdown().await?;

    Ok(())
}
