use thiserror::Error;

use crate::types::ServiceState;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("service '{name}' cannot move from {from} back to {to}")]
    StateRegression {
        name: String,
        from: ServiceState,
        to: ServiceState,
    },
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
