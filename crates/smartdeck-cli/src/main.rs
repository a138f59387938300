//! `smartdeck` – SmartPort controller bridge
//!
//! Runs a command deck against a SmartPort board (or a simulated one) and
//! drives it from newline-delimited JSON events:
//!
//! 1. Loads `smartdeck.toml` (or `--config`), applying `SMARTDECK_*`
//!    environment overrides and then `--serial` / `--device`.
//! 2. Builds the deck: controller slots, vehicle table and one shared link
//!    per board-backed device type.  Any failure here is fatal.
//! 3. Reads events from stdin and writes player-list notices to stdout until
//!    end of input or the first transport fault.
//!
//! Logs go to stderr so stdout stays a clean event stream.

mod config;
mod events;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use smartdeck_hal::{DeviceKind, SerialOpener, SimOpener, TransportOpener};
use smartdeck_kernel::{CommandDeck, EventRouter};

use crate::events::JsonLinesSink;

/// Bridge browser controller sessions to SmartPort vehicles.
#[derive(Parser, Debug)]
#[command(name = "smartdeck", version, about)]
struct Args {
    /// Path to the deck configuration file
    #[arg(short, long, default_value = "smartdeck.toml")]
    config: PathBuf,

    /// Serial port of the SmartPort board (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long)]
    serial: Option<String>,

    /// Device type to use for every configured vehicle
    #[arg(short, long)]
    device: Option<String>,

    /// Use an in-memory board instead of the serial port
    #[arg(long)]
    simulate: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); SMARTDECK_LOG_FORMAT=json switches
    // to newline-delimited JSON.  Always stderr: stdout carries events.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("SMARTDECK_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(io::stderr)
            .compact()
            .init();
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "smartdeck stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let mut cfg = config::load_or_default(&args.config)?;
    config::apply_cli_overrides(&mut cfg, args.serial.as_deref(), args.device.as_deref());
    info!(
        config = %args.config.display(),
        vehicles = cfg.vehicles.len(),
        port = cfg.serial.port.as_deref().unwrap_or("-"),
        simulate = args.simulate,
        "configuration loaded"
    );

    let opener: Box<dyn TransportOpener> = if args.simulate {
        Box::new(SimOpener::new().with_board_echo())
    } else {
        Box::new(SerialOpener::new(cfg.serial.clone()))
    };
    let deck = CommandDeck::new(&cfg, opener).map_err(|e| e.to_string())?;

    let mut router = EventRouter::new(deck, JsonLinesSink::new(io::stdout().lock()));
    let outcome = events::run(io::stdin().lock(), &mut router);

    if let Some(stats) = router.deck().link_stats(DeviceKind::SmartPortArduino) {
        info!(
            packets_sent = stats.packets_sent,
            acks_decoded = stats.acks_decoded,
            frames_dropped = stats.frames_dropped,
            "board link statistics"
        );
    }

    let processed = outcome.map_err(|e| e.to_string())?;
    info!(events = processed, "input closed");
    Ok(())
}
