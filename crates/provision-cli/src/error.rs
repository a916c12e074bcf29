use std::path::PathBuf;

use provision_operations::OperationError;
use provision_operations::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("address pool could not be built")]
    Pool(#[from] provision_pool::PoolError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("failed to read boxfile '{path}'")]
    Boxfile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no service named '{0}' has been set up")]
    UnknownService(String),

    #[error("failed to render output")]
    Render(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
