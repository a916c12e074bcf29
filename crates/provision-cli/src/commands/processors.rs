use provision_operations::config::ProvisionConfig;

use crate::error::Result;
use crate::runtime;

pub(crate) fn run(config: &ProvisionConfig) -> Result<()> {
    let registry = runtime::build_registry(config)?;
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}
