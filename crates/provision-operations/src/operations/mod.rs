mod reservations;
mod service_setup;

pub use reservations::restore_reservations;
pub use service_setup::{
    BRIDGE_GLOBAL_IP, LAUNCH_CONTAINER, MAP_NAT, PERSIST_SERVICE, PLAN_SERVICE,
    PROJECT_ENVIRONMENT, PULL_IMAGE, ProvisionData, RESERVE_GLOBAL_IP, RESERVE_LOCAL_IP,
    SERVICE_SETUP, ServiceSetup, ServiceSetupContext, SetupOutcome, SetupSettings, register,
};
