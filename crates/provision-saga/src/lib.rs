//! Saga pattern for multi-step provisioning with compensation.
//!
//! A saga runs typed steps in order, each step's output feeding the next
//! step. Every completed step keeps a copy of what it produced; when a later
//! step fails, those outputs are handed back to the completed steps so they
//! can release whatever they acquired.

mod audit;
mod builder;
mod erased;
mod error;
mod rollback;
mod saga;
mod step;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use builder::SagaBuilder;
pub use error::{CompensationError, SagaError};
pub use rollback::{CompensationFailureMode, RollbackOrder, RollbackPolicy};
pub use saga::Saga;
pub use step::SagaStep;
