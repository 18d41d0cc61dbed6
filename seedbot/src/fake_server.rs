//! Scripted stand-in for a game server
//!
//! Speaks the same keyed protocol as the real thing and keeps just enough
//! state (rotation, map catalog, idle timer, player count) to exercise the bot
//! end to end. Used by the tests and by the `fake_server` binary.
//!
//! Rotation semantics modelled here:
//! - `rotdel` of a catalog map that is not in rotation succeeds and does nothing
//! - `rotdel` of the only map left in rotation succeeds but the map stays, since
//!   a rotation is never empty (set `retain_last_map` to false to disable)
//! - `rotadd`/`rotdel` of a map outside the catalog is rejected

use log::{debug, info};
use shared::{transform, Key, MSGLEN, SUCCESS};
use std::io;
use std::net::SocketAddr;
use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};

/// Enough room for any reply to land in one write, so frame boundaries
/// on the client side fall exactly on [`MSGLEN`].
const PIPE_CAPACITY: usize = 1 << 20;

const FAILURE: &str = "FAIL";

#[derive(Debug, Clone)]
pub struct ServerState {
    pub key: Vec<u8>,
    pub password: String,
    pub rotation: Vec<String>,
    pub catalog: Vec<String>,
    pub idle_time: u32,
    pub players: u32,
    pub current_map: String,
    pub retain_last_map: bool,
    /// Replaces the `get players` reply verbatim
    pub raw_players: Option<String>,
    /// Exact command lines answered with a failure
    pub reject: Vec<String>,
    /// Every command received, in order
    pub commands: Vec<String>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            key: b"\x13\x37seedbot\xfe".to_vec(),
            password: String::new(),
            rotation: Vec::new(),
            catalog: Vec::new(),
            idle_time: 0,
            players: 0,
            current_map: String::new(),
            retain_last_map: true,
            raw_players: None,
            reject: Vec::new(),
            commands: Vec::new(),
        }
    }
}

impl ServerState {
    fn in_catalog(&self, map: &str) -> bool {
        self.catalog.iter().any(|m| m == map)
    }

    /// Applies one command and returns the reply text.
    pub fn handle(&mut self, line: &str, authenticated: &mut bool) -> String {
        self.commands.push(line.to_string());

        if self.reject.iter().any(|r| r == line) {
            return FAILURE.to_string();
        }

        if let Some(password) = line.strip_prefix("login ") {
            *authenticated = password == self.password;
            return (if *authenticated { SUCCESS } else { FAILURE }).to_string();
        }

        if !*authenticated {
            return FAILURE.to_string();
        }

        if let Some(seconds) = line.strip_prefix("setkickidletime ") {
            return match seconds.parse() {
                Ok(seconds) => {
                    self.idle_time = seconds;
                    SUCCESS.to_string()
                }
                Err(_) => FAILURE.to_string(),
            };
        }

        if let Some(map) = line.strip_prefix("rotadd ") {
            if !self.in_catalog(map) {
                return FAILURE.to_string();
            }
            self.rotation.push(map.to_string());
            return SUCCESS.to_string();
        }

        if let Some(map) = line.strip_prefix("rotdel ") {
            if !self.in_catalog(map) {
                return FAILURE.to_string();
            }
            let sole = self.rotation.len() == 1 && self.retain_last_map;
            if !sole {
                self.rotation.retain(|m| m != map);
            }
            return SUCCESS.to_string();
        }

        match line {
            "rotlist" => self.rotation.iter().map(|m| format!("{}\n", m)).collect(),
            "get mapsforrotation" => {
                let mut reply = format!("{}\t", self.catalog.len());
                for map in &self.catalog {
                    reply.push_str(map);
                    reply.push('\t');
                }
                reply
            }
            "get idletime" => self.idle_time.to_string(),
            "get players" => self
                .raw_players
                .clone()
                .unwrap_or_else(|| format!("{}\t", self.players)),
            "get map" => self.current_map.clone(),
            _ => FAILURE.to_string(),
        }
    }
}

/// Serves one connection until the client hangs up, then hands the state back.
pub async fn serve<S>(mut stream: S, mut state: ServerState) -> io::Result<ServerState>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let key = Key::new(state.key.clone())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty key"))?;
    stream.write_all(key.as_bytes()).await?;

    let mut authenticated = false;
    let mut buffer = vec![0u8; MSGLEN];

    loop {
        let size = stream.read(&mut buffer).await?;
        if size == 0 {
            break;
        }

        transform(&mut buffer[..size], &key);
        let line = String::from_utf8_lossy(&buffer[..size]).into_owned();
        let mut reply = state.handle(&line, &mut authenticated).into_bytes();
        debug!("fake server: {:?} -> {} bytes", line, reply.len());

        // Each frame restarts the keystream, as the client expects
        for frame in reply.chunks_mut(MSGLEN) {
            transform(frame, &key);
        }
        stream.write_all(&reply).await?;
    }

    Ok(state)
}

/// Handle to a running fake server task
pub struct FakeServer {
    handle: JoinHandle<io::Result<ServerState>>,
}

impl FakeServer {
    /// Runs a fake server on one end of an in-memory pipe and returns the other end.
    pub fn spawn_in_memory(state: ServerState) -> (DuplexStream, FakeServer) {
        let (client, server) = duplex(PIPE_CAPACITY);
        let handle = tokio::spawn(serve(server, state));
        (client, FakeServer { handle })
    }

    /// Listens on `addr` and serves exactly one connection.
    pub async fn listen(addr: &str, state: ServerState) -> io::Result<(SocketAddr, FakeServer)> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!("Fake server listening on {}", local);

        let handle = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await?;
            debug!("fake server: connection from {}", peer);
            serve(stream, state).await
        });

        Ok((local, FakeServer { handle }))
    }

    /// Waits for the client to disconnect and returns the final state.
    pub async fn finish(self) -> Result<io::Result<ServerState>, JoinError> {
        self.handle.await
    }
}
