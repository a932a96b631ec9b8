//! mesamate - restaurant delivery robot controller
//!
//! Loads the floor plan, opens the serial link to the motion controller and
//! drives delivery runs chosen at the console:
//!
//! ```text
//! stdin ──▶ Console ──┐
//!                     ├──▶ event queue ──▶ ExecutionController ──▶ serial
//! serial ─▶ Listener ─┘
//! ```

mod config;
mod console;
mod operator;
mod planner;

use std::env;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use mesamate_link::{
    Context, ControllerConfig, ExecutionController, LinkListener, SerialTransport, Transport,
    event_queue,
};

use crate::config::MesamateConfig;
use crate::console::Console;
use crate::operator::{PendingConfirmation, TerminalOperator};
use crate::planner::Planner;

const DEFAULT_CONFIG_PATH: &str = "mesamate.toml";

/// Read timeout on the serial port; an empty read means "no data yet".
const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Parse config path from command line arguments.
///
/// Supports:
/// - `mesamate <path>` (positional)
/// - `mesamate --config <path>` (flag-based)
/// - `mesamate -c <path>` (short flag)
///
/// Returns `None` when no path was given.
fn parse_config_path(args: &[String]) -> Option<String> {
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    args.get(1).filter(|a| !a.starts_with('-')).cloned()
}

/// An explicit path must exist; the default path falls back to built-in
/// settings when absent.
fn load_config(explicit: Option<String>) -> Result<MesamateConfig, config::ConfigError> {
    match explicit {
        Some(path) => MesamateConfig::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => MesamateConfig::load(DEFAULT_CONFIG_PATH),
        None => Ok(MesamateConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let config_path = parse_config_path(&args);
    let config = load_config(config_path.clone())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("mesamate v{} starting", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => log::info!("Using config: {path}"),
        None => log::info!("Using config: {DEFAULT_CONFIG_PATH} (or built-in defaults)"),
    }

    let planner = Planner::from_map(&config.map, config.stations.clone(), config.run.max_stations)?;
    log::info!(
        "Home at {}, {} stations, up to {} per run",
        planner.home(),
        planner.stations().len(),
        planner.max_stations()
    );

    let (port, transport) = SerialTransport::open_first(
        &config.serial.ports,
        config.serial.baud_rate,
        SERIAL_READ_TIMEOUT,
        config.serial.settle(),
    )?;
    log::info!("Connected to {port}");
    let reader = transport.try_clone()?;

    let pending = PendingConfirmation::new();
    let mut controller = ExecutionController::new(
        Box::new(transport),
        TerminalOperator::stdout(pending.clone()),
        ControllerConfig {
            ack_timeout: config.run.ack_timeout(),
            indicator_count: config.run.max_stations as u32,
        },
    );
    controller.probe()?;

    let ctx = Context::new();
    let (events, queue) = event_queue(config.run.queue_capacity);

    let listener = LinkListener::spawn(reader, events.clone(), ctx.clone(), config.run.poll_interval())?;

    {
        let mut console = Console::new(planner, pending.clone(), events.clone(), io::stdout());
        let ctx = ctx.clone();
        // Blocked on stdin at exit; not joined.
        thread::Builder::new()
            .name("console".into())
            .spawn(move || console.run(io::stdin().lock(), &ctx))?;
    }
    drop(events);

    controller.run(&queue, &ctx);

    log::info!("Shutting down...");
    // A listener blocked on a full queue sees the disconnect.
    drop(queue);
    ctx.cancel();
    listener.join();
    log::info!("mesamate stopped");
    Ok(())
}
