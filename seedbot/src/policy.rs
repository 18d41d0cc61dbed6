//! Idle-kick and rotation mode decisions
//!
//! An empty server gets a very long idle-kick timer, which doubles as the
//! marker for seeding: as long as the timer holds the empty value the server
//! stays on the seed rotation. A busy server gets a short timer so AFK players
//! free up slots.

use crate::error::{Error, Result};
use chrono::{DateTime, Timelike, Utc};
use serde::Deserialize;
use std::fmt;

/// Which rotation template a server should be running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationMode {
    Seed,
    Normal,
    Late,
}

impl RotationMode {
    pub const ALL: [RotationMode; 3] = [
        RotationMode::Seed,
        RotationMode::Normal,
        RotationMode::Late,
    ];

    /// Unknown names fall back to `Normal`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "seed" => RotationMode::Seed,
            "late" => RotationMode::Late,
            _ => RotationMode::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RotationMode::Seed => "seed",
            RotationMode::Normal => "normal",
            RotationMode::Late => "late",
        }
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for idle-kick and mode selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// At or above this many players the busy idle-kick applies
    pub busy_player_threshold: u32,
    pub busy_idle_kick: u32,
    /// Idle-kick for an empty server; also marks the server as seeding
    pub empty_idle_kick: u32,
    /// Late window in UTC hours, exclusive at both ends
    pub late_start_hour_utc: u32,
    pub late_end_hour_utc: u32,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            busy_player_threshold: 90,
            busy_idle_kick: 10,
            empty_idle_kick: 9999,
            late_start_hour_utc: 6,
            late_end_hour_utc: 13,
        }
    }
}

impl PolicySettings {
    pub fn validate(&self) -> Result<()> {
        if self.late_start_hour_utc > 23 || self.late_end_hour_utc > 24 {
            return Err(Error::invalid_config("late window hours must be within a day"));
        }
        if self.busy_idle_kick == self.empty_idle_kick {
            return Err(Error::invalid_config(
                "busy and empty idle-kick values must differ",
            ));
        }
        Ok(())
    }
}

/// Idle-kick timer the server should have for `players` connected.
pub fn desired_idle_kick(players: u32, current: u32, settings: &PolicySettings) -> u32 {
    if players >= settings.busy_player_threshold {
        settings.busy_idle_kick
    } else if players == 0 {
        settings.empty_idle_kick
    } else {
        current
    }
}

/// Picks the rotation mode from the (already adjusted) idle-kick timer and hour.
pub fn select_mode(idle_kick: u32, utc_hour: u32, settings: &PolicySettings) -> RotationMode {
    if idle_kick == settings.empty_idle_kick {
        RotationMode::Seed
    } else if utc_hour > settings.late_start_hour_utc && utc_hour < settings.late_end_hour_utc {
        RotationMode::Late
    } else {
        RotationMode::Normal
    }
}

/// Hour of the day in UTC, 0-23.
pub fn utc_hour(now: DateTime<Utc>) -> u32 {
    now.hour()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mode_names() {
        assert_eq!(RotationMode::from_name("seed"), RotationMode::Seed);
        assert_eq!(RotationMode::from_name("late"), RotationMode::Late);
        assert_eq!(RotationMode::from_name("normal"), RotationMode::Normal);
        assert_eq!(RotationMode::from_name("weekend"), RotationMode::Normal);
        assert_eq!(RotationMode::Late.to_string(), "late");
    }

    #[test]
    fn test_idle_kick_thresholds() {
        let settings = PolicySettings::default();

        assert_eq!(desired_idle_kick(90, 9999, &settings), 10);
        assert_eq!(desired_idle_kick(100, 15, &settings), 10);
        assert_eq!(desired_idle_kick(0, 10, &settings), 9999);
        assert_eq!(desired_idle_kick(89, 9999, &settings), 9999);
        assert_eq!(desired_idle_kick(40, 15, &settings), 15);
    }

    #[test]
    fn test_seed_wins_over_clock() {
        let settings = PolicySettings::default();
        assert_eq!(select_mode(9999, 9, &settings), RotationMode::Seed);
    }

    #[test]
    fn test_late_window_is_exclusive() {
        let settings = PolicySettings::default();

        assert_eq!(select_mode(10, 6, &settings), RotationMode::Normal);
        assert_eq!(select_mode(10, 7, &settings), RotationMode::Late);
        assert_eq!(select_mode(10, 12, &settings), RotationMode::Late);
        assert_eq!(select_mode(10, 13, &settings), RotationMode::Normal);
        assert_eq!(select_mode(10, 20, &settings), RotationMode::Normal);
    }

    #[test]
    fn test_utc_hour() {
        let at = |h, m, s| Utc.with_ymd_and_hms(2024, 3, 9, h, m, s).unwrap();

        assert_eq!(utc_hour(at(0, 0, 0)), 0);
        assert_eq!(utc_hour(at(7, 0, 59)), 7);
        assert_eq!(utc_hour(at(23, 59, 59)), 23);
    }

    #[test]
    fn test_validate() {
        assert!(PolicySettings::default().validate().is_ok());

        let settings = PolicySettings {
            busy_idle_kick: 9999,
            ..PolicySettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
