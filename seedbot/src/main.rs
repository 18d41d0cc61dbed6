use clap::Parser;
use log::{error, info};
use seedbot::config::Config;
use seedbot::policy::RotationMode;
use seedbot::runner::{run_all, RunSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON config file
    config: PathBuf,

    /// Deadline in seconds for each connect, read and write
    #[arg(short = 't', long, default_value = "10")]
    timeout_secs: u64,

    /// Only run the server with this name
    #[arg(short = 'o', long)]
    only: Option<String>,

    /// Force every server onto this rotation regardless of players and time
    #[arg(short = 'm', long, value_parser = ["seed", "normal", "late"])]
    mode: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let ids: Vec<usize> = match &args.only {
        Some(name) => match config.server_index(name) {
            Some(id) => vec![id],
            None => {
                error!("No server named {:?} in {}", name, args.config.display());
                std::process::exit(2);
            }
        },
        None => (0..config.servers.len()).collect(),
    };

    let settings = RunSettings {
        io_timeout: Duration::from_secs(args.timeout_secs),
        mode_override: args.mode.as_deref().map(RotationMode::from_name),
    };
    if let Some(mode) = settings.mode_override {
        info!("Forcing {{{}}} mode", mode);
    }

    info!("Running {} server(s)", ids.len());
    let reports = run_all(Arc::new(config), ids, settings).await;

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    for report in &reports {
        match &report.result {
            Ok(status) => info!(
                "[{}] {}: ok ({} mode, {} players)",
                report.id, report.name, status.mode, status.players
            ),
            Err(e) => error!("[{}] {}: failed: {}", report.id, report.name, e),
        }
    }

    if failed > 0 {
        error!("{} of {} server(s) failed", failed, reports.len());
        std::process::exit(1);
    }
}
