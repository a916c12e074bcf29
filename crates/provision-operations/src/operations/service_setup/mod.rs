mod context;
mod operation;
mod saga_data;
mod saga_steps;

pub use context::{ServiceSetupContext, SetupSettings};
pub use operation::{SERVICE_SETUP, ServiceSetup, SetupOutcome, register};
pub use saga_data::ProvisionData;
pub use saga_steps::{
    BRIDGE_GLOBAL_IP, LAUNCH_CONTAINER, MAP_NAT, PERSIST_SERVICE, PLAN_SERVICE,
    PROJECT_ENVIRONMENT, PULL_IMAGE, RESERVE_GLOBAL_IP, RESERVE_LOCAL_IP,
};
