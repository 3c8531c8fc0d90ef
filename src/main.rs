// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, set up logging, run one command.
// - Diagnostics go to stderr through `tracing`; `-v` or `RUST_LOG` turn them up.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flux_relay_cli::{cli::Cli, commands, settings::Settings};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "flux_relay_cli=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let settings = Settings::resolve(cli.api_url, cli.config, cli.verbose);
    commands::dispatch(&settings, cli.command)
}
