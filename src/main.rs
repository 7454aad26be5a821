use clap::Parser;
use tracing::{error, info};

use fancy::config_file::apply_config_layer;
use fancy::{logging, runner, Cli, FancyConfig};

/// clap's own exit status for usage errors
const EXIT_INVALID_USAGE: i32 = 2;

fn main() {
    logging::init();

    let raw_args: Vec<String> = std::env::args().collect();
    let args = match apply_config_layer(raw_args) {
        Ok(args) => args,
        Err(e) => {
            error!("config error: {:#}", e);
            std::process::exit(EXIT_INVALID_USAGE);
        }
    };

    let cli = Cli::parse_from(&args);
    let flags = args.get(1..).unwrap_or_default();

    info!(
        "run fancy v.{} with flags {:?}",
        env!("CARGO_PKG_VERSION"),
        flags
    );

    let config = match FancyConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {:#}", e);
            std::process::exit(EXIT_INVALID_USAGE);
        }
    };

    let stdin = std::io::stdin();
    let outcome = match runner::run(&config, stdin.lock()) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("startup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    info!(
        "end fancy with flags {:?}: {} {}",
        flags,
        outcome.summary,
        outcome.stats.snapshot()
    );

    // Records still queued for workers or the shipper are abandoned here.
    std::process::exit(0);
}
