//! AroundU TUI entry point.

use std::{fs::File, io, path::PathBuf, sync::Mutex};

use aroundu_client::ClientConfig;
use aroundu_core::location::{DEFAULT_RADIUS, RADIUS_PRESETS};
use aroundu_tui::{Runtime, SystemEnv, TerminalDriver};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "aroundu=info";

/// AroundU terminal client
#[derive(Parser, Debug)]
#[command(name = "aroundu-tui")]
#[command(about = "Chat with people nearby from the terminal")]
#[command(version)]
struct Args {
    /// Server base URL
    #[arg(short, long, env = "AROUNDU_SERVER", default_value = "http://localhost:5004")]
    server: String,

    /// Discovery radius in meters (500, 1000 or 2000)
    #[arg(short, long, env = "AROUNDU_RADIUS", default_value_t = DEFAULT_RADIUS, value_parser = parse_radius)]
    radius: u32,

    /// Latitude to register automatically
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude to register automatically
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Write logs to this file. Logging is off otherwise, the terminal is
    /// taken by the UI.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not start matching automatically after registration
    #[arg(long)]
    no_auto_match: bool,
}

fn parse_radius(value: &str) -> Result<u32, String> {
    let radius: u32 = value.parse().map_err(|e| format!("{e}"))?;
    if RADIUS_PRESETS.contains(&radius) {
        Ok(radius)
    } else {
        Err(format!("radius must be one of {RADIUS_PRESETS:?}"))
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        },
        None => tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::sink).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let mut config = ClientConfig::default();
    config.session.auto_match = !args.no_auto_match;

    let mut driver = TerminalDriver::new(config.channel.connect_timeout)?;
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        driver = driver.with_location(lat, lon);
    }

    tracing::info!(server = %args.server, radius = args.radius, "starting");
    let mut runtime = Runtime::new(driver, SystemEnv::new(), config, args.server);
    runtime.app_mut().set_radius(args.radius);

    Ok(runtime.run().await?)
}
