pub mod boxfile;
pub mod config;
pub mod environment;
mod error;
pub mod operations;
pub mod password;
pub mod plan;
pub mod processor;
pub mod providers;
pub mod traits;

#[cfg(test)]
pub mod mocks;

pub use error::{CompensationFailure, ExternalError, OperationError, Result};
pub use processor::{ProcessControl, Processor, ProcessorFactory, ProcessorRegistry};
