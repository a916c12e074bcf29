mod env;
mod processors;
mod setup;
mod show;

use clap::Subcommand;
use provision_operations::config::ProvisionConfig;

use crate::error::Result;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Pull, launch, network and plan a service
    Setup(setup::SetupArgs),
    /// Print a service record as JSON
    Show {
        /// Service name, e.g. data.db
        name: String,
    },
    /// Print the application's environment variables
    Env,
    /// List registered processors
    Processors,
}

impl Commands {
    pub(crate) fn execute(self, config: &ProvisionConfig) -> Result<()> {
        match self {
            Self::Setup(args) => setup::run(config, args),
            Self::Show { name } => show::run(config, &name),
            Self::Env => env::run(config),
            Self::Processors => processors::run(config),
        }
    }
}
