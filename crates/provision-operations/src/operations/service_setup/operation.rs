use provision_core::{Service, ServiceState};
use provision_saga::{CompensationFailureMode, RollbackOrder, Saga, SagaAuditLog, SagaBuilder};
use serde_json::Value;
use tracing::{info, warn};

use super::context::ServiceSetupContext;
use super::saga_data::ProvisionData;
use super::saga_steps::{
    BridgeGlobalIpStep, LaunchContainerStep, MapNatStep, PersistServiceStep, PlanServiceStep,
    ProjectEnvironmentStep, PullImageStep, ReserveGlobalIpStep, ReserveLocalIpStep,
};
use crate::Result;
use crate::boxfile::Boxfile;
use crate::error::OperationError;
use crate::processor::{ProcessControl, Processor, ProcessorRegistry};
use crate::traits::{ContainerEngine, KeyValueStore, NetworkProvider};

/// Registry name of the service setup processor.
pub const SERVICE_SETUP: &str = "service_setup";

type SetupSaga<E, N, S> =
    Saga<ProvisionData, ProvisionData, ServiceSetupContext<E, N, S>, OperationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The saga ran and the service is now planned.
    Provisioned(Service),
    /// The record was already past setup; nothing was touched.
    AlreadyProvisioned(Service),
}

impl SetupOutcome {
    #[must_use]
    pub fn service(&self) -> &Service {
        match self {
            Self::Provisioned(service) | Self::AlreadyProvisioned(service) => service,
        }
    }
}

/// Turns a `name` + `image` request into a running, networked, recorded
/// service, undoing partial work if any stage fails.
pub struct ServiceSetup<E, N, S> {
    ctx: ServiceSetupContext<E, N, S>,
    name: String,
    image: String,
    label: String,
    config: Value,
    outcome: Option<SetupOutcome>,
    audit_log: Option<SagaAuditLog>,
}

impl<E, N, S> ServiceSetup<E, N, S>
where
    E: ContainerEngine + 'static,
    N: NetworkProvider + 'static,
    S: KeyValueStore + 'static,
{
    /// Validate the request carried by `control`.
    ///
    /// Requires `name` and `image`; `label` defaults to `name` and `boxfile`,
    /// if given, must be valid YAML. Nothing external is touched.
    ///
    /// # Errors
    ///
    /// Returns `MissingMeta` or `Boxfile`.
    pub fn new(ctx: ServiceSetupContext<E, N, S>, mut control: ProcessControl) -> Result<Self> {
        let name = control.require_meta("name")?.to_string();
        let image = control.require_meta("image")?.to_string();
        let label = control.meta("label").unwrap_or(name.as_str()).to_string();
        let config = Boxfile::parse(control.meta("boxfile").unwrap_or_default())?
            .service_config(&name);

        control.set_meta("label", label.clone());

        Ok(Self {
            ctx: ctx.with_control(control),
            name,
            image,
            label,
            config,
            outcome: None,
            audit_log: None,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SetupOutcome> {
        self.outcome.as_ref()
    }

    /// Audit log of the most recent saga run, if the saga ran.
    #[must_use]
    pub fn audit_log(&self) -> Option<&SagaAuditLog> {
        self.audit_log.as_ref()
    }

    /// Run the setup, or confirm it already happened.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage. If rolling back that
    /// stage's predecessors also failed, returns `SagaCompensationFailed`
    /// naming the compensations that never ran.
    pub fn execute(&mut self) -> Result<&SetupOutcome> {
        self.ctx
            .control()
            .bullet(&format!("Launching {}...", self.label));

        let app = self.ctx.settings().app_name();
        let previous: Option<Service> = self.ctx.store().get(app, &self.name)?;

        if let Some(existing) = previous
            .as_ref()
            .filter(|service| service.is_past(ServiceState::Initialized))
        {
            info!(
                service = %self.name,
                state = %existing.state,
                "service already set up, skipping"
            );
            return Ok(&*self
                .outcome
                .insert(SetupOutcome::AlreadyProvisioned(existing.clone())));
        }

        let data = ProvisionData::new(&self.name, &self.image, self.config.clone(), previous);
        let saga = Self::build_saga(self.ctx.settings().rollback_order());
        let (result, audit_log) = saga.execute_with_audit(&self.ctx, data);
        self.audit_log = Some(audit_log);

        let data = result.map_err(OperationError::from).inspect_err(|err| {
            if let OperationError::SagaCompensationFailed { step, skipped, .. } = err {
                warn!(
                    service = %self.name,
                    failed_step = %step,
                    ?skipped,
                    "rollback incomplete, resources may be leaked"
                );
            }
        })?;
        let service = data.service.ok_or(OperationError::IncompleteSagaData {
            step: SERVICE_SETUP,
            field: "service",
        })?;

        info!(service = %service.name, id = %service.id, "service set up");
        Ok(&*self.outcome.insert(SetupOutcome::Provisioned(service)))
    }

    fn build_saga(order: RollbackOrder) -> SetupSaga<E, N, S> {
        SagaBuilder::new()
            .rollback_order(order)
            .on_compensation_failure(CompensationFailureMode::Halt)
            .first_step(PullImageStep::<E, N, S>::new())
            .then(ReserveLocalIpStep::<E, N, S>::new())
            .then(ReserveGlobalIpStep::<E, N, S>::new())
            .then(LaunchContainerStep::<E, N, S>::new())
            .then(BridgeGlobalIpStep::<E, N, S>::new())
            .then(MapNatStep::<E, N, S>::new())
            .then(PlanServiceStep::<E, N, S>::new())
            .then(PersistServiceStep::<E, N, S>::new())
            .then(ProjectEnvironmentStep::<E, N, S>::new())
            .build()
    }
}

impl<E, N, S> Processor for ServiceSetup<E, N, S>
where
    E: ContainerEngine + 'static,
    N: NetworkProvider + 'static,
    S: KeyValueStore + 'static,
{
    fn process(&mut self) -> Result<()> {
        self.execute().map(|_| ())
    }

    fn results(&self) -> ProcessControl {
        let mut control = self.ctx.control().clone();
        if let Some(outcome) = &self.outcome {
            let service = outcome.service();
            control.set_meta("state", service.state.to_string());
            control.set_meta("container_id", service.id.clone());
            if let Some(ip) = service.internal_ip {
                control.set_meta("internal_ip", ip.to_string());
            }
            if let Some(ip) = service.external_ip {
                control.set_meta("external_ip", ip.to_string());
            }
        }
        control
    }
}

/// Register `service_setup` with processors built on `ctx`.
///
/// # Errors
///
/// Returns `DuplicateProcessor` if the name is taken.
pub fn register<E, N, S>(
    registry: &mut ProcessorRegistry,
    ctx: ServiceSetupContext<E, N, S>,
) -> Result<()>
where
    E: ContainerEngine + 'static,
    N: NetworkProvider + 'static,
    S: KeyValueStore + 'static,
{
    registry.register(SERVICE_SETUP, move |control| {
        let setup = ServiceSetup::new(ctx.clone(), control)?;
        Ok(Box::new(setup) as Box<dyn Processor>)
    })
}
