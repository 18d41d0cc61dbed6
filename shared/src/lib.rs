//! Wire-level building blocks for the game server admin protocol.
//!
//! Nothing in here touches a socket. The crate holds the keystream codec,
//! the command vocabulary and the parsers that turn raw response text into
//! typed values, so both the bot and the fake server agree on one definition.

use std::fmt;
use thiserror::Error;

/// Size of one wire frame. A response frame of exactly this length means the
/// peer may have more to send.
pub const MSGLEN: usize = 16384;

/// Literal reply the server gives to an accepted login or mutating command.
pub const SUCCESS: &str = "SUCCESS";

/// Per-connection XOR key handed out by the server at handshake time.
///
/// Construction refuses an empty key, so [`transform`] never has to.
#[derive(Clone, PartialEq, Eq)]
pub struct Key(Vec<u8>);

impl Key {
    /// Wraps the raw handshake bytes. Returns `None` for an empty key.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            None
        } else {
            Some(Key(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({} bytes)", self.0.len())
    }
}

/// XORs `data` in place with the key, cycling from key index 0.
///
/// Applying it twice with the same key restores the input. Every frame starts
/// the keystream over, so call this once per frame rather than per message.
pub fn transform(data: &mut [u8], key: &Key) {
    for (byte, k) in data.iter_mut().zip(key.0.iter().cycle()) {
        *byte ^= k;
    }
}

/// Commands understood by the server.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Login(&'a str),
    RotList,
    MapsForRotation,
    IdleTime,
    Players,
    CurrentMap,
    SetKickIdleTime(u32),
    RotAdd(&'a str),
    RotDel(&'a str),
}

impl Command<'_> {
    /// Text safe to put in a log line; hides the login password.
    pub fn redacted(&self) -> String {
        match self {
            Command::Login(_) => "login ********".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Login(password) => write!(f, "login {}", password),
            Command::RotList => f.write_str("rotlist"),
            Command::MapsForRotation => f.write_str("get mapsforrotation"),
            Command::IdleTime => f.write_str("get idletime"),
            Command::Players => f.write_str("get players"),
            Command::CurrentMap => f.write_str("get map"),
            Command::SetKickIdleTime(seconds) => write!(f, "setkickidletime {}", seconds),
            Command::RotAdd(map) => write!(f, "rotadd {}", map),
            Command::RotDel(map) => write!(f, "rotdel {}", map),
        }
    }
}

impl fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Result of a command whose only meaningful reply is `SUCCESS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Rejected(String),
}

impl CommandOutcome {
    pub fn from_response(text: &str) -> Self {
        if text == SUCCESS {
            CommandOutcome::Success
        } else {
            CommandOutcome::Rejected(text.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("rotation list is missing its trailing newline: {0:?}")]
    MissingTerminator(String),
    #[error("{0} response contains an empty map name")]
    EmptyMapName(&'static str),
    #[error("map catalog needs a header and a terminator field: {0:?}")]
    TruncatedCatalog(String),
    #[error("no tab delimiter in {0:?}")]
    MissingDelimiter(String),
    #[error("expected an integer, got {0:?}")]
    NotAnInteger(String),
    #[error("reply is not valid UTF-8")]
    InvalidUtf8,
}

/// Parses a `rotlist` reply: newline separated names with a trailing newline.
///
/// An empty reply (or a lone newline) is an empty rotation.
pub fn parse_rotation(text: &str) -> Result<Vec<String>, ParseError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let body = text
        .strip_suffix('\n')
        .ok_or_else(|| ParseError::MissingTerminator(text.to_string()))?;
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split('\n').map(|name| map_name(name, "rotlist")).collect()
}

/// Parses a `get mapsforrotation` reply.
///
/// The reply is tab separated; the first field is a count header and the last
/// one is whatever follows the final tab. Both are dropped. The header is not
/// checked against the number of maps.
pub fn parse_map_catalog(text: &str) -> Result<Vec<String>, ParseError> {
    let fields: Vec<&str> = text.split('\t').collect();
    if fields.len() < 2 {
        return Err(ParseError::TruncatedCatalog(text.to_string()));
    }

    fields[1..fields.len() - 1]
        .iter()
        .map(|name| map_name(name, "mapsforrotation"))
        .collect()
}

/// Parses a `get players` reply; the player count is the first tab field.
pub fn parse_player_count(text: &str) -> Result<u32, ParseError> {
    let (count, _) = text
        .split_once('\t')
        .ok_or_else(|| ParseError::MissingDelimiter(text.to_string()))?;
    parse_integer(count)
}

/// Parses a `get idletime` reply.
pub fn parse_idle_time(text: &str) -> Result<u32, ParseError> {
    parse_integer(text)
}

fn parse_integer(text: &str) -> Result<u32, ParseError> {
    text.trim()
        .parse()
        .map_err(|_| ParseError::NotAnInteger(text.to_string()))
}

fn map_name(name: &str, source: &'static str) -> Result<String, ParseError> {
    if name.is_empty() {
        Err(ParseError::EmptyMapName(source))
    } else {
        Ok(name.to_string())
    }
}
