mod commands;
pub mod exit_codes;
pub mod output;

pub use commands::{Cli, Commands, ConfigCommands};

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config;

pub fn run(cli: Cli) -> Result<()> {
    let path = config::get_config_path(cli.config.as_deref())?;
    let loaded = config::load(&path);

    let log_level = loaded.as_ref().ok().map(|c| c.settings.log_level.as_str());
    init_logging(cli.verbose, log_level);

    commands::execute(cli, &path, loaded)
}

/// RUST_LOG wins, then -v/-vv, then the config's log level, then "warn"
fn log_filter(verbose: u8, configured: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = match verbose {
        0 => configured.unwrap_or(config::DEFAULT_LOG_LEVEL),
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL))
}

/// logs go to stderr so JSON on stdout stays parseable
fn init_logging(verbose: u8, configured: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(log_filter(verbose, configured))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
