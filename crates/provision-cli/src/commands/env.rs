use provision_core::{EnvVars, env_namespace};
use provision_operations::config::ProvisionConfig;
use provision_operations::environment::ENV_KEY;
use provision_operations::traits::KeyValueStore;

use crate::error::Result;
use crate::runtime;

pub(crate) fn run(config: &ProvisionConfig) -> Result<()> {
    let store = runtime::open_store(config);
    let table: EnvVars = store
        .get(&env_namespace(config.app_name()), ENV_KEY)?
        .unwrap_or_default();

    for (key, value) in table.iter() {
        println!("{key}={value}");
    }
    Ok(())
}
