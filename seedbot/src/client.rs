//! Typed command client built on [`Session`]
//!
//! Every helper here is one request and one (possibly multi-frame) reply.

use crate::error::{Error, Result};
use crate::session::Session;
use log::debug;
use shared::{
    parse_idle_time, parse_map_catalog, parse_player_count, parse_rotation, Command,
    CommandOutcome, ParseError,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// An authenticated session
#[derive(Debug)]
pub struct Client<S> {
    session: Session<S>,
}

impl Client<TcpStream> {
    /// Opens a session to `addr` and logs in.
    pub async fn connect(addr: &str, password: &str, io_timeout: Duration) -> Result<Self> {
        let session = Session::open(addr, io_timeout).await?;
        Client::login(session, password).await
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticates a keyed session.
    ///
    /// Anything but a literal `SUCCESS` is a handshake failure and the session
    /// is dropped, closing the connection.
    pub async fn login(session: Session<S>, password: &str) -> Result<Self> {
        let mut client = Client { session };
        match client.execute(Command::Login(password)).await? {
            CommandOutcome::Success => Ok(client),
            CommandOutcome::Rejected(response) => Err(Error::handshake(format!(
                "login rejected: {:?}",
                response
            ))),
        }
    }

    /// Sends raw command text and returns the full decoded reply.
    ///
    /// A reply that is not valid UTF-8 is a [`Error::Protocol`]; map names
    /// must round-trip byte for byte into later `rotdel`/`rotadd` commands.
    pub async fn run_command(&mut self, command: &str) -> Result<String> {
        self.exchange(command, command).await
    }

    /// `shown` names the command in errors so passwords stay out of them.
    async fn exchange(&mut self, command: &str, shown: &str) -> Result<String> {
        self.session.send(command.as_bytes()).await?;
        let reply = self.session.receive().await?;
        String::from_utf8(reply).map_err(|_| Error::Protocol {
            command: shown.to_string(),
            source: ParseError::InvalidUtf8,
        })
    }

    async fn request(&mut self, command: Command<'_>) -> Result<String> {
        let shown = command.redacted();
        debug!("> {}", shown);
        let reply = self.exchange(&command.to_string(), &shown).await?;
        debug!("< {} bytes", reply.len());
        Ok(reply)
    }

    /// Sends a command whose reply is `SUCCESS` or a rejection message.
    pub async fn execute(&mut self, command: Command<'_>) -> Result<CommandOutcome> {
        let reply = self.request(command).await?;
        Ok(CommandOutcome::from_response(&reply))
    }

    async fn query<T>(
        &mut self,
        command: Command<'_>,
        parse: fn(&str) -> Result<T, ParseError>,
    ) -> Result<T> {
        let reply = self.request(command).await?;
        parse(&reply).map_err(|source| Error::Protocol {
            command: command.redacted(),
            source,
        })
    }

    /// The live rotation, in server order.
    pub async fn rotation(&mut self) -> Result<Vec<String>> {
        self.query(Command::RotList, parse_rotation).await
    }

    /// Every map the server can put into rotation.
    pub async fn map_catalog(&mut self) -> Result<Vec<String>> {
        self.query(Command::MapsForRotation, parse_map_catalog).await
    }

    /// Current idle-kick timer.
    pub async fn idle_time(&mut self) -> Result<u32> {
        self.query(Command::IdleTime, parse_idle_time).await
    }

    pub async fn player_count(&mut self) -> Result<u32> {
        self.query(Command::Players, parse_player_count).await
    }

    pub async fn current_map(&mut self) -> Result<String> {
        self.request(Command::CurrentMap).await
    }

    /// The reply carries nothing the bot relies on, so it is discarded.
    pub async fn set_idle_kick_time(&mut self, seconds: u32) -> Result<()> {
        self.request(Command::SetKickIdleTime(seconds)).await?;
        Ok(())
    }

    pub async fn rot_add(&mut self, map: &str) -> Result<CommandOutcome> {
        self.execute(Command::RotAdd(map)).await
    }

    pub async fn rot_delete(&mut self, map: &str) -> Result<CommandOutcome> {
        self.execute(Command::RotDel(map)).await
    }

    pub async fn close(self) -> Result<()> {
        self.session.close().await
    }
}

/// Turns a rejected mutating command into [`Error::CommandRejected`].
pub fn expect_success(command: Command<'_>, outcome: CommandOutcome) -> Result<()> {
    match outcome {
        CommandOutcome::Success => Ok(()),
        CommandOutcome::Rejected(response) => Err(Error::CommandRejected {
            command: command.redacted(),
            response,
        }),
    }
}
