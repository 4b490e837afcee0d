//! Recall Core - Shared types, history store, and protocol codec
//!
//! This crate provides:
//! - The wire protocol codec (requests, responses, framing constants)
//! - Database schema and migrations
//! - The history store (command interning + execution log)
//! - The scoped search engine
//! - Git branch resolution
//! - IPC client transport for the one-shot `recall` binary

pub mod error;
pub mod git;
pub mod ipc;
pub mod protocol;
pub mod schema;
pub mod search;
pub mod store;

pub use error::Error;
pub use ipc::{socket_path, IpcError};
pub use protocol::{ProtocolError, Request, Scope};
pub use schema::init_schema;
pub use search::{SearchHit, SUGGEST_LIMIT};
pub use store::{ExecutionRecord, HistoryStore};
