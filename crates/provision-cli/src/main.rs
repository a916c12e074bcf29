mod commands;
mod error;
mod runtime;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use provision_operations::config::{DEFAULT_CONFIG_FILE, ProvisionConfig};
use tracing_subscriber::EnvFilter;

use crate::commands::Commands;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "provision")]
#[command(version = env!("PROVISION_VERSION"))]
#[command(about = "Provision containerized services for an application", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log more (-v for info, -vv for debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = ProvisionConfig::load(&cli.config)
        .map_err(CliError::from)
        .and_then(|config| cli.command.execute(&config));

    if let Err(e) = result {
        print_error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,provision=info",
        _ => "warn,provision=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_error(error: &CliError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = std::error::Error::source(cause);
    }
}
