use std::marker::PhantomData;

use provision_core::{EnvVars, Service, ServiceState, ServiceType, env_namespace};
use provision_saga::SagaStep;
use tracing::{debug, info};

use super::context::ServiceSetupContext;
use super::saga_data::ProvisionData;
use crate::environment::{self, ENV_KEY};
use crate::error::OperationError;
use crate::traits::{ContainerConfig, ContainerEngine, KeyValueStore, NetworkProvider};
use crate::{password, plan};

pub const PULL_IMAGE: &str = "pull_image";
pub const RESERVE_LOCAL_IP: &str = "reserve_local_ip";
pub const RESERVE_GLOBAL_IP: &str = "reserve_global_ip";
pub const LAUNCH_CONTAINER: &str = "launch_container";
pub const BRIDGE_GLOBAL_IP: &str = "bridge_global_ip";
pub const MAP_NAT: &str = "map_nat";
pub const PLAN_SERVICE: &str = "plan_service";
pub const PERSIST_SERVICE: &str = "persist_service";
pub const PROJECT_ENVIRONMENT: &str = "project_environment";

macro_rules! setup_step {
    ($(#[$doc:meta])* $step:ident) => {
        $(#[$doc])*
        pub struct $step<E, N, S> {
            _marker: PhantomData<(E, N, S)>,
        }

        impl<E, N, S> $step<E, N, S> {
            #[must_use]
            pub fn new() -> Self {
                Self {
                    _marker: PhantomData,
                }
            }
        }

        impl<E, N, S> Default for $step<E, N, S> {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

setup_step!(
    /// Fetch the service image. Nothing to undo.
    PullImageStep
);
setup_step!(
    /// Take a free address on the container network.
    ReserveLocalIpStep
);
setup_step!(
    /// Take a free host-routable address.
    ReserveGlobalIpStep
);
setup_step!(
    /// Create and start the container on the internal network.
    LaunchContainerStep
);
setup_step!(
    /// Bind the global address to the host.
    BridgeGlobalIpStep
);
setup_step!(
    /// Route the global address to the container's local one.
    MapNatStep
);
setup_step!(
    /// Ask the running service what it needs.
    PlanServiceStep
);
setup_step!(
    /// Write the planned service record, with fresh passwords.
    PersistServiceStep
);
setup_step!(
    /// Merge the service's variables into the application env table.
    ProjectEnvironmentStep
);

impl<E, N, S> SagaStep for PullImageStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        PULL_IMAGE
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let control = ctx.control();
        let level = control.display_level() + 1;
        let prefix = format!("+ Pulling {} -", input.image);

        debug!(image = %input.image, "pulling image");
        ctx.engine()
            .pull_image(&input.image, &mut |line: &str| {
                control.progress().emit(level, &format!("{prefix} {line}"));
            })
            .map_err(OperationError::external(PULL_IMAGE))?;
        Ok(input)
    }
}

impl<E, N, S> SagaStep for ReserveLocalIpStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        RESERVE_LOCAL_IP
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let ip = ctx.pool().reserve_local()?;
        debug!(service = %input.name, %ip, "reserved local address");
        input.local_ip = Some(ip);
        Ok(input)
    }

    fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
        let ip = output.local_ip(RESERVE_LOCAL_IP)?;
        debug!(service = %output.name, %ip, "returning local address");
        ctx.pool().release(ip)?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        "return the local address to the pool".to_string()
    }
}

impl<E, N, S> SagaStep for ReserveGlobalIpStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        RESERVE_GLOBAL_IP
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let ip = ctx.pool().reserve_global()?;
        debug!(service = %input.name, %ip, "reserved global address");
        input.global_ip = Some(ip);
        Ok(input)
    }

    fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
        let ip = output.global_ip(RESERVE_GLOBAL_IP)?;
        debug!(service = %output.name, %ip, "returning global address");
        ctx.pool().release(ip)?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        "return the global address to the pool".to_string()
    }
}

impl<E, N, S> SagaStep for LaunchContainerStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        LAUNCH_CONTAINER
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        ctx.control().sub_bullet("Starting container...");

        let config = ContainerConfig {
            name: ctx.settings().container_name(&input.name),
            image: input.image.clone(),
            network: ctx.settings().network().to_string(),
            ip: input.local_ip(LAUNCH_CONTAINER)?,
        };
        let handle = ctx
            .engine()
            .create_container(&config)
            .map_err(OperationError::external(LAUNCH_CONTAINER))?;

        info!(
            container = %config.name,
            id = %handle.id,
            ip = %config.ip,
            "container launched"
        );
        input.container_id = Some(handle.id);
        Ok(input)
    }

    fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
        let id = output.container_id(LAUNCH_CONTAINER)?;
        debug!(id, "removing container");
        ctx.engine()
            .remove_container(id)
            .map_err(OperationError::external(LAUNCH_CONTAINER))
    }

    fn compensation_description(&self) -> String {
        "remove the container".to_string()
    }
}

impl<E, N, S> SagaStep for BridgeGlobalIpStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        BRIDGE_GLOBAL_IP
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        ctx.control()
            .sub_bullet("Bridging container to host network...");

        let global = input.global_ip(BRIDGE_GLOBAL_IP)?;
        ctx.network()
            .add_ip(global)
            .map_err(OperationError::external(BRIDGE_GLOBAL_IP))?;
        debug!(%global, "global address bound to host");
        Ok(input)
    }

    fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
        let global = output.global_ip(BRIDGE_GLOBAL_IP)?;
        debug!(%global, "unbinding global address");
        ctx.network()
            .remove_ip(global)
            .map_err(OperationError::external(BRIDGE_GLOBAL_IP))
    }

    fn compensation_description(&self) -> String {
        "unbind the global address from the host".to_string()
    }
}

impl<E, N, S> SagaStep for MapNatStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        MAP_NAT
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let global = input.global_ip(MAP_NAT)?;
        let local = input.local_ip(MAP_NAT)?;
        ctx.network()
            .add_nat(global, local)
            .map_err(OperationError::external(MAP_NAT))?;
        debug!(%global, %local, "address translation installed");
        Ok(input)
    }

    fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
        let global = output.global_ip(MAP_NAT)?;
        let local = output.local_ip(MAP_NAT)?;
        debug!(%global, %local, "removing address translation");
        ctx.network()
            .remove_nat(global, local)
            .map_err(OperationError::external(MAP_NAT))
    }

    fn compensation_description(&self) -> String {
        "remove the address translation".to_string()
    }
}

impl<E, N, S> SagaStep for PlanServiceStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        PLAN_SERVICE
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let control = ctx.control();
        control.sub_bullet("Gathering service requirements...");
        let level = control.display_level() + 2;

        let container_id = input.container_id(PLAN_SERVICE)?;
        let output = plan::run(
            ctx.engine(),
            container_id,
            &ctx.settings().plan_command(),
            &input.config,
            PLAN_SERVICE,
            &mut |line: &str| control.progress().emit(level, line),
        )?;

        debug!(bytes = output.len(), "plan hook answered");
        input.plan_output = Some(output);
        Ok(input)
    }
}

impl<E, N, S> SagaStep for PersistServiceStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        PERSIST_SERVICE
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let raw = input
            .plan_output
            .as_deref()
            .ok_or(OperationError::IncompleteSagaData {
                step: PERSIST_SERVICE,
                field: "plan_output",
            })?;
        let mut plan = plan::parse(raw, PERSIST_SERVICE)?;
        for user in &mut plan.users {
            user.password = password::generate(ctx.settings().password_length());
        }

        let mut service = input
            .previous
            .clone()
            .unwrap_or_else(|| Service::new(input.name.as_str()));
        service.name.clone_from(&input.name);
        service.id = input.container_id(PERSIST_SERVICE)?.to_string();
        service.internal_ip = Some(input.local_ip(PERSIST_SERVICE)?);
        service.external_ip = Some(input.global_ip(PERSIST_SERVICE)?);
        service.kind = Some(ServiceType::Data);
        service.plan = plan;
        service.advance(ServiceState::Planned)?;

        ctx.store()
            .put(ctx.settings().app_name(), &input.name, &service)?;
        info!(
            service = %service.name,
            state = %service.state,
            users = service.plan.users.len(),
            "service persisted"
        );

        input.service = Some(service);
        Ok(input)
    }

    fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
        let app = ctx.settings().app_name();
        match &output.previous {
            Some(previous) => {
                debug!(service = %output.name, "restoring previous service record");
                ctx.store().put(app, &output.name, previous)
            }
            None => {
                debug!(service = %output.name, "removing service record");
                ctx.store().delete(app, &output.name)
            }
        }
    }

    fn compensation_description(&self) -> String {
        "restore the service record as it was before setup".to_string()
    }
}

impl<E, N, S> SagaStep for ProjectEnvironmentStep<E, N, S>
where
    E: ContainerEngine,
    N: NetworkProvider,
    S: KeyValueStore,
{
    type Input = ProvisionData;
    type Output = ProvisionData;
    type Context = ServiceSetupContext<E, N, S>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        PROJECT_ENVIRONMENT
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let vars = environment::project(input.service(PROJECT_ENVIRONMENT)?);
        let namespace = env_namespace(ctx.settings().app_name());

        let mut table: EnvVars = ctx.store().get(&namespace, ENV_KEY)?.unwrap_or_default();
        table.merge(vars.clone());
        ctx.store().put(&namespace, ENV_KEY, &table)?;

        debug!(
            service = %input.name,
            added = vars.len(),
            total = table.len(),
            "environment updated"
        );
        input.env = Some(vars);
        Ok(input)
    }
}
