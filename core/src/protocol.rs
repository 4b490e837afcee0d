//! Wire protocol codec for client/daemon requests
//!
//! Requests are single flat records: fields separated by the unit-separator
//! byte (0x1F, which never appears in shell command text), with the first
//! field selecting the layout:
//!
//! ```text
//! SUGGEST <US> query <US> scope <US> context <US> success
//! RECORD  <US> cmd <US> session <US> cwd <US> exit-code <US> duration-ms
//! ```
//!
//! One request per connection. Responses carry no framing at all: a SUGGEST
//! response is a newline-joined list of command texts (possibly empty), a
//! RECORD response is zero bytes. The codec is the only place that touches
//! raw request bytes, so the framing could be swapped without touching
//! dispatch.

use thiserror::Error;

/// Field separator. Chosen outside the printable range so it cannot collide
/// with recorded command text.
pub const DELIMITER: char = '\x1F';

/// Initial per-request read buffer size.
pub const REQUEST_BUF_BYTES: usize = 8192;

/// Hard cap on a single request. Reads keep going past the initial buffer
/// until end-of-stream, but never beyond this.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Search scope for a SUGGEST request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// No context filter.
    Global,
    /// Exact working-directory match.
    Directory(String),
    /// Exact git-branch match.
    Branch(String),
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Look up past commands matching a substring, scoped and ranked.
    Suggest {
        query: String,
        scope: Scope,
        only_success: bool,
    },
    /// Record one command execution.
    Record {
        cmd: String,
        session_id: String,
        cwd: String,
        exit_code: i32,
        duration_ms: i64,
    },
}

/// Decode failure. Any of these causes the daemon to drop the connection
/// without a response and without touching the store.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,

    #[error("request is not valid UTF-8")]
    InvalidUtf8,

    #[error("unknown request tag: {0:?}")]
    UnknownTag(String),

    #[error("{tag} expects {expected} fields, got {got}")]
    WrongFieldCount {
        tag: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("empty required field: {0}")]
    EmptyField(&'static str),

    #[error("unknown scope: {0:?}")]
    UnknownScope(String),

    #[error("invalid success flag: {0:?}")]
    InvalidSuccessFlag(String),

    #[error("invalid integer in field {field}: {value:?}")]
    InvalidInteger { field: &'static str, value: String },
}

const SUGGEST_FIELDS: usize = 5;
const RECORD_FIELDS: usize = 6;

/// Encode a request into its wire form.
pub fn encode_request(req: &Request) -> Vec<u8> {
    match req {
        Request::Suggest {
            query,
            scope,
            only_success,
        } => {
            let (scope_tag, context) = match scope {
                Scope::Global => ("global", ""),
                Scope::Directory(v) => ("cwd", v.as_str()),
                Scope::Branch(v) => ("branch", v.as_str()),
            };
            join_fields(&[
                "SUGGEST",
                query.as_str(),
                scope_tag,
                context,
                if *only_success { "1" } else { "0" },
            ])
        }
        Request::Record {
            cmd,
            session_id,
            cwd,
            exit_code,
            duration_ms,
        } => join_fields(&[
            "RECORD",
            cmd.as_str(),
            session_id.as_str(),
            cwd.as_str(),
            exit_code.to_string().as_str(),
            duration_ms.to_string().as_str(),
        ]),
    }
}

fn join_fields(fields: &[&str]) -> Vec<u8> {
    let mut out = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(field);
    }
    out.into_bytes()
}

/// Decode a raw request buffer.
///
/// Empty required fields are rejected here rather than stored as empty
/// context values: a SUGGEST needs a non-empty query (and a non-empty
/// context for any non-global scope), a RECORD needs non-empty command,
/// session, and cwd.
pub fn decode_request(buf: &[u8]) -> Result<Request, ProtocolError> {
    if buf.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let text = std::str::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)?;
    let fields: Vec<&str> = text.split(DELIMITER).collect();

    match fields[0] {
        "SUGGEST" => {
            if fields.len() != SUGGEST_FIELDS {
                return Err(ProtocolError::WrongFieldCount {
                    tag: "SUGGEST",
                    expected: SUGGEST_FIELDS,
                    got: fields.len(),
                });
            }
            let query = required(fields[1], "query")?;
            let scope = decode_scope(fields[2], fields[3])?;
            let only_success = match fields[4] {
                "0" => false,
                "1" => true,
                other => return Err(ProtocolError::InvalidSuccessFlag(other.to_string())),
            };
            Ok(Request::Suggest {
                query,
                scope,
                only_success,
            })
        }
        "RECORD" => {
            if fields.len() != RECORD_FIELDS {
                return Err(ProtocolError::WrongFieldCount {
                    tag: "RECORD",
                    expected: RECORD_FIELDS,
                    got: fields.len(),
                });
            }
            Ok(Request::Record {
                cmd: required(fields[1], "cmd")?,
                session_id: required(fields[2], "session")?,
                cwd: required(fields[3], "cwd")?,
                exit_code: parse_int(fields[4], "exit-code")?,
                duration_ms: parse_int(fields[5], "duration-ms")?,
            })
        }
        other => Err(ProtocolError::UnknownTag(other.to_string())),
    }
}

fn decode_scope(tag: &str, context: &str) -> Result<Scope, ProtocolError> {
    match tag {
        // Context is carried but ignored for global queries.
        "global" => Ok(Scope::Global),
        "cwd" => Ok(Scope::Directory(required(context, "context")?)),
        "branch" => Ok(Scope::Branch(required(context, "context")?)),
        other => Err(ProtocolError::UnknownScope(other.to_string())),
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ProtocolError> {
    if value.is_empty() {
        Err(ProtocolError::EmptyField(field))
    } else {
        Ok(value.to_string())
    }
}

fn parse_int<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<T, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

/// Encode a SUGGEST response body: one command text per line, empty body
/// when there is nothing to suggest.
pub fn encode_suggestions(texts: &[String]) -> Vec<u8> {
    texts.join("\n").into_bytes()
}
