//! Error types for the rotation bot

use shared::ParseError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can end a server's run.
///
/// None of these are retried; the caller abandons the server and moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// TCP dial failed or timed out
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Key exchange or login failed
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Server reply could not be parsed
    #[error("malformed reply to `{command}`: {source}")]
    Protocol {
        command: String,
        #[source]
        source: ParseError,
    },

    /// Server answered a mutating command with something other than SUCCESS
    #[error("server rejected `{command}`: {response:?}")]
    CommandRejected { command: String, response: String },

    #[error("cannot offset an empty rotation")]
    EmptyRotation,

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The task running a server panicked or was cancelled
    #[error("server task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub(crate) fn timed_out(what: &str) -> io::Error {
        io::Error::new(io::ErrorKind::TimedOut, format!("{} timed out", what))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
