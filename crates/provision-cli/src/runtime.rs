use std::sync::Arc;

use provision_operations::ProcessorRegistry;
use provision_operations::config::ProvisionConfig;
use provision_operations::operations::{ServiceSetupContext, register, restore_reservations};
use provision_operations::providers::{DockerCli, FileSystemStore, HostNetwork};
use tracing::debug;

use crate::error::Result;

/// Store for the configured data directory.
pub(crate) fn open_store(config: &ProvisionConfig) -> Arc<FileSystemStore> {
    Arc::new(FileSystemStore::new(config.data_dir()))
}

/// Wire real collaborators into a processor registry.
///
/// The pool starts empty, so addresses of already persisted services are
/// claimed before anything can reserve one.
pub(crate) fn build_registry(config: &ProvisionConfig) -> Result<ProcessorRegistry> {
    let store = open_store(config);
    let pool = Arc::new(config.build_pool()?);
    let restored = restore_reservations(store.as_ref(), config.app_name(), &pool)?;
    debug!(restored, app = config.app_name(), "pool re-seeded from persisted services");

    let ctx = ServiceSetupContext::new(
        Arc::new(DockerCli::new().with_binary(config.engine())),
        Arc::new(HostNetwork::new(config.interface())),
        store,
        pool,
        config.setup_settings(),
    );

    let mut registry = ProcessorRegistry::new();
    register(&mut registry, ctx)?;
    Ok(registry)
}
