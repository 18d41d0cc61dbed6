//! Per-server automation run
//!
//! Each configured server gets its own task and its own session. A failure
//! ends that server's run only; the others carry on.

use crate::client::Client;
use crate::config::{Config, ServerConfig};
use crate::error::{Error, Result};
use crate::policy::{desired_idle_kick, select_mode, utc_hour, RotationMode};
use crate::reconciler::{swap_rotation, Reconciliation};
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinError;

/// Settings that come from the command line rather than the config file
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Deadline for each connect, read and write
    pub io_timeout: Duration,
    /// Forces every server onto this rotation instead of the player/clock choice
    pub mode_override: Option<RotationMode>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(10),
            mode_override: None,
        }
    }
}

/// What a successful run found and changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub current_map: String,
    pub players: u32,
    pub idle_kick: u32,
    pub idle_kick_changed: bool,
    pub mode: RotationMode,
    pub rotation: Reconciliation,
}

#[derive(Debug)]
pub struct ServerReport {
    pub id: usize,
    pub name: String,
    pub result: Result<ServerStatus>,
}

impl ServerReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything after login: inspect, adjust the idle-kick, pick and apply a rotation.
///
/// `mode_override` replaces the mode selection only; the idle-kick timer is
/// still adjusted for the player count.
pub async fn administer<S>(
    client: &mut Client<S>,
    config: &Config,
    id: usize,
    hour: u32,
    mode_override: Option<RotationMode>,
) -> Result<ServerStatus>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let name = &config.servers[id].name;
    let policy = &config.policy;

    let mut idle_kick = client.idle_time().await?;
    let players = client.player_count().await?;
    let current_map = client.current_map().await?;

    let wanted = desired_idle_kick(players, idle_kick, policy);
    let idle_kick_changed = wanted != idle_kick;
    if idle_kick_changed {
        info!("[{}] {} | Setting new idle time: {}", id, name, wanted);
        client.set_idle_kick_time(wanted).await?;
        idle_kick = wanted;
    }

    let mode = mode_override.unwrap_or_else(|| select_mode(idle_kick, hour, policy));
    let rotation = swap_rotation(client, &config.rotations, id, mode).await?;
    if let Reconciliation::Converged { deleted, added } = rotation {
        info!(
            "[{}] {} | Shifted to {{{}}} mode ({} deletes, {} adds)",
            id, name, mode, deleted, added
        );
    }

    info!(
        "[{}] {} on {} @ {} -- {{{}}}",
        id, name, current_map, players, mode
    );

    Ok(ServerStatus {
        current_map,
        players,
        idle_kick,
        idle_kick_changed,
        mode,
        rotation,
    })
}

/// Connects to server `id`, administers it and closes the session on every path.
pub async fn run_server(
    config: &Config,
    id: usize,
    settings: RunSettings,
) -> Result<ServerStatus> {
    let server: &ServerConfig = &config.servers[id];
    let mut client =
        Client::connect(&server.address(), &server.password, settings.io_timeout).await?;

    let hour = utc_hour(Utc::now());
    let result = administer(&mut client, config, id, hour, settings.mode_override).await;

    if let Err(e) = client.close().await {
        warn!("[{}] {} | Failed to close session: {}", id, server.name, e);
    }
    result
}

/// Runs every server in `ids` concurrently and reports each outcome.
///
/// Reports come back in the order of `ids`.
pub async fn run_all(
    config: Arc<Config>,
    ids: Vec<usize>,
    settings: RunSettings,
) -> Vec<ServerReport> {
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let config = Arc::clone(&config);
            let handle = tokio::spawn(async move { run_server(&config, id, settings).await });
            (id, handle)
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let name = config.servers[id].name.clone();
        reports.push(report(id, name, handle.await));
    }

    reports
}

/// Folds a joined server task into its report; a panicked task is a failure
/// like any other.
fn report(
    id: usize,
    name: String,
    joined: std::result::Result<Result<ServerStatus>, JoinError>,
) -> ServerReport {
    let result = joined.unwrap_or_else(|e| Err(Error::from(e)));
    if let Err(e) = &result {
        error!("[{}] {} | Run aborted: {}", id, name, e);
    }
    ServerReport { id, name, result }
}
