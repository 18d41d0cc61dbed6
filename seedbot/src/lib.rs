//! # Seedbot
//!
//! Keeps a fleet of game servers on the right map rotation. For every
//! configured server it logs in over the admin protocol, looks at who is
//! playing, adjusts the idle-kick timer and swaps the rotation to the seed,
//! normal or late template.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! One TCP connection plus the XOR key the server hands out on connect:
//! - Key exchange on connect
//! - Frame encoding and decoding
//! - Reassembly of replies that span several frames
//! - I/O deadlines on every connect, read and write
//!
//! ### Client Module (`client`)
//! Typed commands on top of a session: login, rotation listing, map catalog,
//! idle timer, player count and rotation edits.
//!
//! ### Reconciler Module (`reconciler`)
//! Offsets a rotation template per server and converges the live rotation
//! onto it with the smallest blunt command sequence that works.
//!
//! ### Policy Module (`policy`)
//! Idle-kick thresholds and the choice between seed, normal and late.
//!
//! ### Runner Module (`runner`)
//! One task per server; collects a report per server so one failure never
//! takes the rest of the fleet down with it.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use seedbot::config::Config;
//! use seedbot::runner::{run_all, RunSettings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::load("seedbot.json")?);
//!     let ids = (0..config.servers.len()).collect();
//!
//!     for report in run_all(config, ids, RunSettings::default()).await {
//!         println!("{}: {}", report.name, report.is_success());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fake_server;
pub mod policy;
pub mod reconciler;
pub mod runner;
pub mod session;

pub use error::{Error, Result};
