use provision_core::Service;
use provision_operations::config::ProvisionConfig;
use provision_operations::traits::KeyValueStore;

use crate::error::{CliError, Result};
use crate::runtime;

pub(crate) fn run(config: &ProvisionConfig, name: &str) -> Result<()> {
    let store = runtime::open_store(config);
    let service: Service = store
        .get(config.app_name(), name)?
        .ok_or_else(|| CliError::UnknownService(name.to_string()))?;

    println!("{}", serde_json::to_string_pretty(&service)?);
    Ok(())
}
