use std::path::PathBuf;

use clap::Parser;
use omnidrive_runtime::config::RuntimeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Drivetrain runtime: Zenoh teleop and move commands in, motor commands out
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use simulated motors instead of the servo bus
    #[arg(long)]
    sim: bool,

    /// Serial port of the servo bus
    #[arg(short, long)]
    port: Option<String>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => RuntimeConfig::default(),
    };
    if args.sim {
        config.simulate = true;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    info!("Config: {:?}", config);

    if let Err(e) = omnidrive_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
