use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use provision_operations::ProcessControl;
use provision_operations::config::ProvisionConfig;
use provision_operations::operations::SERVICE_SETUP;
use provision_operations::providers::TerminalProgress;

use crate::error::{CliError, Result};
use crate::runtime;

#[derive(Args)]
pub(crate) struct SetupArgs {
    /// Service name, e.g. data.db
    #[arg(long)]
    name: String,

    /// Image to run the service from
    #[arg(long)]
    image: String,

    /// Display label (default: the name)
    #[arg(long)]
    label: Option<String>,

    /// YAML file holding per-service config
    #[arg(long)]
    boxfile: Option<PathBuf>,
}

pub(crate) fn run(config: &ProvisionConfig, args: SetupArgs) -> Result<()> {
    let mut control = ProcessControl::new(Arc::new(TerminalProgress))
        .with_meta("name", args.name)
        .with_meta("image", args.image);
    if let Some(label) = args.label {
        control.set_meta("label", label);
    }
    if let Some(path) = args.boxfile {
        let content = fs::read_to_string(&path)
            .map_err(|source| CliError::Boxfile { path, source })?;
        control.set_meta("boxfile", content);
    }

    let registry = runtime::build_registry(config)?;
    let results = registry.run(SERVICE_SETUP, control)?;

    print_results(&results);
    Ok(())
}

fn print_results(results: &ProcessControl) {
    println!(
        "{}: {}",
        results.meta("name").unwrap_or_default(),
        results.meta("state").unwrap_or("unknown")
    );
    for (key, label) in [
        ("container_id", "container"),
        ("internal_ip", "internal ip"),
        ("external_ip", "external ip"),
    ] {
        if let Some(value) = results.meta(key) {
            println!("  {label}: {value}");
        }
    }
}
