//! Obfuscated transport over one TCP connection
//!
//! The server opens every connection by sending a single raw frame: the XOR
//! key for the rest of the conversation. After that every frame in either
//! direction is passed through [`shared::transform`], with the keystream
//! restarting at the start of each frame.
//!
//! There is no length prefix on the wire. A request is one write and a reply
//! is read frame by frame until a frame comes back shorter than [`MSGLEN`].

use crate::error::{Error, Result};
use log::debug;
use shared::{transform, Key, MSGLEN};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// One keyed connection to one server
///
/// Owned by a single task and never shared; commands go out strictly one at
/// a time. Dropping the session closes the connection.
#[derive(Debug)]
pub struct Session<S> {
    stream: S,
    key: Key,
    io_timeout: Duration,
}

impl Session<TcpStream> {
    /// Dials `addr` and performs the key exchange.
    pub async fn open(addr: &str, io_timeout: Duration) -> Result<Self> {
        let stream = match timeout(io_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(Error::Connect {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(Error::Connect {
                    addr: addr.to_string(),
                    source: Error::timed_out("connect"),
                })
            }
        };

        debug!("Connected to {}", addr);
        Session::establish(stream, io_timeout).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the key frame from a freshly connected stream.
    ///
    /// The key frame is taken as-is, whatever its length, and is not decoded.
    pub async fn establish(mut stream: S, io_timeout: Duration) -> Result<Self> {
        let mut buffer = vec![0u8; MSGLEN];
        let size = match timeout(io_timeout, stream.read(&mut buffer)).await {
            Ok(Ok(size)) => size,
            Ok(Err(e)) => return Err(Error::handshake(format!("failed to read key: {}", e))),
            Err(_) => return Err(Error::handshake("timed out waiting for key")),
        };

        buffer.truncate(size);
        let key = Key::new(buffer)
            .ok_or_else(|| Error::handshake("server closed the connection before sending a key"))?;
        debug!("Received session key ({} bytes)", size);

        Ok(Session {
            stream,
            key,
            io_timeout,
        })
    }

    /// Encodes `plaintext` and writes it as one frame.
    pub async fn send(&mut self, plaintext: &[u8]) -> Result<()> {
        let mut frame = plaintext.to_vec();
        transform(&mut frame, &self.key);

        match timeout(self.io_timeout, self.stream.write_all(&frame)).await {
            Ok(result) => result.map_err(Error::Write),
            Err(_) => Err(Error::Write(Error::timed_out("write"))),
        }
    }

    /// Reads one frame of at most `buffer.len()` bytes and decodes it in place.
    ///
    /// A closed connection is an error, never an empty frame.
    pub async fn receive_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let size = match timeout(self.io_timeout, self.stream.read(buffer)).await {
            Ok(result) => result.map_err(Error::Read)?,
            Err(_) => return Err(Error::Read(Error::timed_out("read"))),
        };

        if size == 0 {
            return Err(Error::Read(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }

        transform(&mut buffer[..size], &self.key);
        Ok(size)
    }

    /// Reads frames until one is shorter than [`MSGLEN`] and returns them joined.
    ///
    /// A reply that is an exact multiple of [`MSGLEN`] leaves the last read
    /// waiting for a frame that never comes; it ends with a read error once
    /// the server closes or the I/O timeout expires.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        let mut frame = vec![0u8; MSGLEN];
        let mut message = Vec::new();

        loop {
            let size = self.receive_frame(&mut frame).await?;
            message.extend_from_slice(&frame[..size]);

            if size < MSGLEN {
                break;
            }
            debug!("Full frame received, reading continuation");
        }

        Ok(message)
    }

    /// Shuts the write half down. The socket itself closes on drop.
    pub async fn close(mut self) -> Result<()> {
        match timeout(self.io_timeout, self.stream.shutdown()).await {
            Ok(result) => result.map_err(Error::Write),
            Err(_) => Err(Error::Write(Error::timed_out("shutdown"))),
        }
    }
}
