use std::sync::Arc;

use provision_pool::IpPool;
use provision_saga::RollbackOrder;

use crate::config::{DEFAULT_CONTAINER_PREFIX, DEFAULT_NETWORK, DEFAULT_PLAN_COMMAND};
use crate::password::{DEFAULT_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use crate::processor::ProcessControl;
use crate::traits::{ContainerEngine, KeyValueStore, NetworkProvider};

/// Knobs of the service setup saga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSettings {
    app_name: String,
    container_prefix: String,
    network: String,
    plan_command: String,
    password_length: usize,
    rollback_order: RollbackOrder,
}

impl SetupSettings {
    #[must_use]
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            container_prefix: DEFAULT_CONTAINER_PREFIX.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            plan_command: DEFAULT_PLAN_COMMAND.to_string(),
            password_length: DEFAULT_PASSWORD_LENGTH,
            rollback_order: RollbackOrder::Forward,
        }
    }

    #[must_use]
    pub fn with_container_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.container_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    #[must_use]
    pub fn with_plan_command(mut self, command: impl Into<String>) -> Self {
        self.plan_command = command.into();
        self
    }

    #[must_use]
    pub fn with_password_length(mut self, length: usize) -> Self {
        self.password_length = length.max(MIN_PASSWORD_LENGTH);
        self
    }

    #[must_use]
    pub fn with_rollback_order(mut self, order: RollbackOrder) -> Self {
        self.rollback_order = order;
        self
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn container_prefix(&self) -> &str {
        &self.container_prefix
    }

    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Plan hook command split into program and arguments.
    #[must_use]
    pub fn plan_command(&self) -> Vec<&str> {
        self.plan_command.split_whitespace().collect()
    }

    #[must_use]
    pub fn password_length(&self) -> usize {
        self.password_length
    }

    #[must_use]
    pub fn rollback_order(&self) -> RollbackOrder {
        self.rollback_order
    }

    /// Container name for service `name`: `<prefix>-<app>-<name>`.
    #[must_use]
    pub fn container_name(&self, name: &str) -> String {
        format!("{}-{}-{name}", self.container_prefix, self.app_name)
    }
}

/// Collaborators and settings shared by every step of a service setup.
pub struct ServiceSetupContext<E, N, S> {
    engine: Arc<E>,
    network: Arc<N>,
    store: Arc<S>,
    pool: Arc<IpPool>,
    settings: Arc<SetupSettings>,
    control: ProcessControl,
}

impl<E, N, S> Clone for ServiceSetupContext<E, N, S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            network: Arc::clone(&self.network),
            store: Arc::clone(&self.store),
            pool: Arc::clone(&self.pool),
            settings: Arc::clone(&self.settings),
            control: self.control.clone(),
        }
    }
}

impl<E, N, S> ServiceSetupContext<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    pub fn new(
        engine: Arc<E>,
        network: Arc<N>,
        store: Arc<S>,
        pool: Arc<IpPool>,
        settings: SetupSettings,
    ) -> Self {
        Self {
            engine,
            network,
            store,
            pool,
            settings: Arc::new(settings),
            control: ProcessControl::silent(),
        }
    }

    /// Same collaborators, reporting through `control`.
    #[must_use]
    pub fn with_control(mut self, control: ProcessControl) -> Self {
        self.control = control;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub fn network(&self) -> &N {
        &self.network
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn pool(&self) -> &IpPool {
        &self.pool
    }

    #[must_use]
    pub fn settings(&self) -> &SetupSettings {
        &self.settings
    }

    #[must_use]
    pub fn control(&self) -> &ProcessControl {
        &self.control
    }
}
