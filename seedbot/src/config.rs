//! JSON configuration: rotation policies, servers and policy thresholds

use crate::error::{Error, Result};
use crate::policy::{PolicySettings, RotationMode};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// The three rotation templates a server can be switched between
#[derive(Debug, Clone, Deserialize)]
pub struct Rotations {
    pub seed: Vec<String>,
    pub normal: Vec<String>,
    pub late: Vec<String>,
}

impl Rotations {
    pub fn select(&self, mode: RotationMode) -> &[String] {
        match mode {
            RotationMode::Seed => &self.seed,
            RotationMode::Normal => &self.normal,
            RotationMode::Late => &self.late,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    #[serde(alias = "host")]
    pub ip: String,
    pub port: u16,
    pub password: String,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

// Keeps the password out of logs and panics
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("ip", &self.ip)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rotations: Rotations,
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub policy: PolicySettings,
}

impl Config {
    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for mode in RotationMode::ALL {
            let rotation = self.rotations.select(mode);
            if rotation.is_empty() {
                return Err(Error::invalid_config(format!("{} rotation is empty", mode)));
            }
            if rotation.iter().any(|map| map.trim().is_empty()) {
                return Err(Error::invalid_config(format!(
                    "{} rotation contains an empty map name",
                    mode
                )));
            }
        }

        if self.servers.is_empty() {
            return Err(Error::invalid_config("no servers configured"));
        }

        for (id, server) in self.servers.iter().enumerate() {
            if server.name.trim().is_empty() {
                return Err(Error::invalid_config(format!("server {} has no name", id)));
            }
            if server.ip.trim().is_empty() {
                return Err(Error::invalid_config(format!(
                    "server {} has no address",
                    server.name
                )));
            }
        }

        self.policy.validate()
    }

    /// Ordinal of the server called `name`, if configured.
    pub fn server_index(&self, name: &str) -> Option<usize> {
        self.servers.iter().position(|s| s.name == name)
    }
}
