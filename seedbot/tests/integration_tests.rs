//! Integration tests for the rotation bot
//!
//! These run the full connect/login/reconcile cycle over real loopback TCP
//! against scripted fake servers.

use seedbot::client::Client;
use seedbot::config::Config;
use seedbot::fake_server::{FakeServer, ServerState};
use seedbot::policy::RotationMode;
use seedbot::reconciler::Reconciliation;
use seedbot::runner::{run_all, RunSettings};
use seedbot::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

const CATALOG: &[&str] = &["foy", "carentan", "kursk", "utah", "omaha"];

fn maps(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn fake(password: &str, rotation: &[&str], players: u32) -> ServerState {
    ServerState {
        password: password.to_string(),
        rotation: maps(rotation),
        catalog: maps(CATALOG),
        idle_time: 30,
        players,
        current_map: rotation.first().unwrap_or(&"foy").to_string(),
        ..ServerState::default()
    }
}

fn fleet_config(addrs: &[SocketAddr]) -> Config {
    let servers: Vec<String> = addrs
        .iter()
        .enumerate()
        .map(|(i, addr)| {
            format!(
                r#"{{"name": "srv{}", "ip": "{}", "port": {}, "password": "pw"}}"#,
                i,
                addr.ip(),
                addr.port()
            )
        })
        .collect();

    let json = format!(
        r#"{{
            "rotations": {{
                "seed": ["foy", "carentan", "kursk"],
                "normal": ["utah", "omaha"],
                "late": ["omaha"]
            }},
            "servers": [{}]
        }}"#,
        servers.join(",")
    );
    Config::from_json(&json).unwrap()
}

/// CLIENT OVER TCP
mod client_tests {
    use super::*;

    /// Tests key exchange, login and typed queries over a real socket
    #[tokio::test]
    async fn login_and_query_over_tcp() {
        let (addr, server) = FakeServer::listen("127.0.0.1:0", fake("pw", &["foy", "utah"], 12))
            .await
            .unwrap();

        let mut client = Client::connect(&addr.to_string(), "pw", TIMEOUT)
            .await
            .unwrap();
        assert_eq!(client.rotation().await.unwrap(), vec!["foy", "utah"]);
        assert_eq!(client.map_catalog().await.unwrap(), maps(CATALOG));
        assert_eq!(client.player_count().await.unwrap(), 12);
        assert_eq!(client.idle_time().await.unwrap(), 30);
        client.close().await.unwrap();

        let state = server.finish().await.unwrap().unwrap();
        assert_eq!(state.commands.len(), 5);
    }

    /// Tests that a rejected login never yields a usable client
    #[tokio::test]
    async fn wrong_password_fails_handshake() {
        let (addr, server) = FakeServer::listen("127.0.0.1:0", fake("pw", &["foy"], 0))
            .await
            .unwrap();

        let result = Client::connect(&addr.to_string(), "nope", TIMEOUT).await;
        assert!(matches!(result, Err(Error::Handshake(_))));

        // Connection was dropped right after the login attempt
        let state = server.finish().await.unwrap().unwrap();
        assert_eq!(state.commands, vec!["login nope"]);
    }

    /// Tests that a server that never sends a key times out instead of hanging
    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        let result = Client::connect(&addr.to_string(), "pw", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::Handshake(_))));
        hold.abort();
    }
}

/// FLEET RUNS
mod fleet_tests {
    use super::*;

    /// Tests that each server converges or fails on its own
    #[tokio::test]
    async fn failures_stay_per_server() {
        // Empty servers go to seed mode regardless of the clock
        let converging = fake("pw", &["carentan", "foy"], 0);
        let (addr0, server0) = FakeServer::listen("127.0.0.1:0", converging).await.unwrap();
        let locked_out = fake("other", &["foy"], 0);
        let (addr1, server1) = FakeServer::listen("127.0.0.1:0", locked_out).await.unwrap();
        let mut rejecting = fake("pw", &["utah", "carentan"], 0);
        rejecting.reject = vec!["rotdel utah".to_string()];
        let (addr2, server2) = FakeServer::listen("127.0.0.1:0", rejecting).await.unwrap();

        let config = Arc::new(fleet_config(&[addr0, addr1, addr2]));
        let settings = RunSettings {
            io_timeout: TIMEOUT,
            ..RunSettings::default()
        };
        let reports = run_all(config, vec![0, 1, 2], settings).await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].name, "srv0");

        let status = reports[0].result.as_ref().unwrap();
        assert_eq!(status.mode, RotationMode::Seed);
        assert_eq!(status.idle_kick, 9999);
        assert!(matches!(status.rotation, Reconciliation::Converged { added: 2, .. }));

        assert!(matches!(reports[1].result, Err(Error::Handshake(_))));

        match &reports[2].result {
            Err(Error::CommandRejected { command, .. }) => assert_eq!(command, "rotdel utah"),
            other => panic!("Expected rejection, got {:?}", other),
        }

        let state0 = server0.finish().await.unwrap().unwrap();
        assert_eq!(state0.rotation, vec!["foy", "carentan", "kursk"]);
        assert_eq!(state0.idle_time, 9999);

        let state1 = server1.finish().await.unwrap().unwrap();
        assert_eq!(state1.commands.len(), 1);

        // Idle timer was applied before the rotation edit failed; nothing after it ran
        let state2 = server2.finish().await.unwrap().unwrap();
        assert_eq!(state2.idle_time, 9999);
        assert_eq!(state2.commands.last().map(String::as_str), Some("rotdel utah"));
        assert_eq!(state2.rotation, vec!["utah", "carentan"]);
    }

    /// Tests that identical servers get offset rotations
    #[tokio::test]
    async fn ordinals_offset_shared_template() {
        let (addr0, server0) = FakeServer::listen("127.0.0.1:0", fake("pw", &["kursk", "foy"], 0))
            .await
            .unwrap();
        let (addr1, server1) = FakeServer::listen("127.0.0.1:0", fake("pw", &["foy", "kursk"], 0))
            .await
            .unwrap();

        let config = Arc::new(fleet_config(&[addr0, addr1]));
        let reports = run_all(config, vec![0, 1], RunSettings::default()).await;
        assert!(reports.iter().all(|r| r.is_success()));

        // Ordinal 0 starts at foy, ordinal 1 at kursk
        let state0 = server0.finish().await.unwrap().unwrap();
        assert_eq!(state0.rotation, vec!["foy", "carentan", "kursk"]);
        let state1 = server1.finish().await.unwrap().unwrap();
        assert_eq!(state1.rotation, vec!["kursk", "foy", "carentan"]);
    }

    /// Tests that a second run against a converged server changes nothing
    #[tokio::test]
    async fn second_run_is_noop() {
        let (addr, server) = FakeServer::listen("127.0.0.1:0", fake("pw", &["carentan", "foy"], 0))
            .await
            .unwrap();
        let config = Arc::new(fleet_config(&[addr]));
        run_all(Arc::clone(&config), vec![0], RunSettings::default()).await;
        let converged = server.finish().await.unwrap().unwrap();

        let mut state = converged.clone();
        state.commands.clear();
        let (addr, server) = FakeServer::listen("127.0.0.1:0", state).await.unwrap();
        let config = Arc::new(fleet_config(&[addr]));
        let reports = run_all(config, vec![0], RunSettings::default()).await;

        let status = reports[0].result.as_ref().unwrap();
        assert_eq!(status.rotation, Reconciliation::Unchanged);
        assert!(!status.idle_kick_changed);

        let state = server.finish().await.unwrap().unwrap();
        assert!(!state.commands.iter().any(|c| c.starts_with("rotadd") || c.starts_with("rotdel")));
        assert_eq!(state.rotation, converged.rotation);
    }
}

/// CONFIG FILES
mod config_tests {
    use super::*;

    /// Tests loading a config from disk
    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("seedbot-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "rotations": {"seed": ["foy"], "normal": ["utah"], "late": ["omaha"]},
                "servers": [{"name": "a", "ip": "127.0.0.1", "port": 7779, "password": "pw"}],
                "policy": {"busy_player_threshold": 70}
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.servers[0].address(), "127.0.0.1:7779");
        assert_eq!(config.policy.busy_player_threshold, 70);
        assert_eq!(config.policy.busy_idle_kick, 10);
    }
}
