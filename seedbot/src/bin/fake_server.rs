//! Stand-alone fake game server for trying the bot by hand.
//!
//! Serves connections one after another, carrying the rotation state over
//! from one connection to the next.

use clap::Parser;
use log::{error, info};
use seedbot::fake_server::{serve, ServerState};
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on
    #[arg(short = 'l', long, default_value = "127.0.0.1:7779")]
    listen: String,

    /// Password the bot must log in with
    #[arg(short = 'p', long, default_value = "changeme")]
    password: String,

    /// Comma separated map catalog
    #[arg(short = 'c', long, value_delimiter = ',', required = true)]
    catalog: Vec<String>,

    /// Comma separated starting rotation
    #[arg(short = 'r', long, value_delimiter = ',')]
    rotation: Vec<String>,

    /// Reported player count
    #[arg(long, default_value = "0")]
    players: u32,

    /// Let `rotdel` remove the last map, leaving the rotation empty
    #[arg(long)]
    allow_empty_rotation: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let listener = TcpListener::bind(&args.listen).await?;
    info!("Fake server listening on {}", listener.local_addr()?);

    let mut state = ServerState {
        password: args.password,
        current_map: args.rotation.first().cloned().unwrap_or_default(),
        rotation: args.rotation,
        catalog: args.catalog,
        players: args.players,
        retain_last_map: !args.allow_empty_rotation,
        ..ServerState::default()
    };

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Connection from {}", peer);

        let snapshot = state.clone();
        match serve(stream, state).await {
            Ok(next) => {
                info!("Rotation now: {}", next.rotation.join(", "));
                state = next;
            }
            Err(e) => {
                error!("Connection from {} failed: {}", peer, e);
                state = snapshot;
            }
        }
        state.commands.clear();
    }
}
