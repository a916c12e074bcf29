use provision_saga::SagaError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a collaborator outside this process: the container
/// engine, the host network, or the key-value store.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExternalError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ExternalError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Details about a failed compensation during saga rollback.
#[derive(Debug)]
pub struct CompensationFailure {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The error that occurred during compensation.
    pub error: Box<OperationError>,
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Core(#[from] provision_core::ProvisionError),

    #[error(transparent)]
    Pool(#[from] provision_pool::PoolError),

    #[error("missing required metadata '{0}'")]
    MissingMeta(&'static str),

    #[error("processor '{0}' is already registered")]
    DuplicateProcessor(String),

    #[error("unknown processor '{name}' (available: {available})")]
    UnknownProcessor { name: String, available: String },

    #[error("{stage} failed")]
    External {
        stage: &'static str,
        #[source]
        source: ExternalError,
    },

    #[error("failed to encode plan request")]
    PlanPayload(#[source] serde_json::Error),

    #[error("plan response could not be parsed in {stage}")]
    PlanParse {
        stage: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("boxfile is not valid YAML")]
    Boxfile(#[source] serde_yml::Error),

    #[error("failed to read '{namespace}/{key}' from the store")]
    StoreRead {
        namespace: String,
        key: String,
        #[source]
        source: ExternalError,
    },

    #[error("failed to write '{namespace}/{key}' to the store")]
    StoreWrite {
        namespace: String,
        key: String,
        #[source]
        source: ExternalError,
    },

    #[error("stored value '{namespace}/{key}' is malformed")]
    StoreDecode {
        namespace: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode '{namespace}/{key}' for the store")]
    StoreEncode {
        namespace: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("saga data is missing '{field}' in {step}")]
    IncompleteSagaData {
        step: &'static str,
        field: &'static str,
    },

    #[error("service setup failed at step '{step}'")]
    SagaFailed {
        step: String,
        #[source]
        source: Box<OperationError>,
    },

    #[error(
        "service setup failed at step '{step}' and {} compensation(s) also failed", compensation_failures.len()
    )]
    SagaCompensationFailed {
        step: String,
        source: Box<OperationError>,
        compensation_failures: Vec<CompensationFailure>,
        /// Compensations that never ran; their resources are still held.
        skipped: Vec<String>,
    },

    #[error("service setup failed at step '{step}' in an unrecognized way")]
    SagaUnrecognized { step: String },
}

pub type Result<T> = std::result::Result<T, OperationError>;

impl OperationError {
    pub(crate) fn external(stage: &'static str) -> impl FnOnce(ExternalError) -> Self {
        move |source| Self::External { stage, source }
    }
}

impl From<SagaError<OperationError>> for OperationError {
    fn from(err: SagaError<OperationError>) -> Self {
        match err {
            SagaError::StepFailed { step, source } => Self::SagaFailed {
                step,
                source: Box::new(source),
            },
            SagaError::CompensationFailed {
                failed_step,
                step_error,
                compensation_errors,
                skipped,
            } => {
                let compensation_failures = compensation_errors
                    .into_iter()
                    .map(|e| CompensationFailure {
                        step: e.step,
                        description: e.description,
                        error: Box::new(e.error),
                    })
                    .collect();
                Self::SagaCompensationFailed {
                    step: failed_step,
                    source: Box::new(step_error),
                    compensation_failures,
                    skipped,
                }
            }
            other => Self::SagaUnrecognized {
                step: other.failed_step().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use provision_saga::CompensationError;

    use super::*;

    #[test]
    fn step_failure_keeps_step_name_and_source() {
        let err = OperationError::from(SagaError::StepFailed {
            step: "map_nat".to_string(),
            source: OperationError::External {
                stage: "map_nat",
                source: ExternalError::new("iptables exited with status 4"),
            },
        });

        assert_eq!(err.to_string(), "service setup failed at step 'map_nat'");
        let source = err.source().expect("has source");
        assert_eq!(source.to_string(), "map_nat failed");
        assert_eq!(
            source.source().expect("has cause").to_string(),
            "iptables exited with status 4"
        );
    }

    #[test]
    fn compensation_failure_carries_skipped_steps() {
        let err = OperationError::from(SagaError::CompensationFailed {
            failed_step: "map_nat".to_string(),
            step_error: OperationError::MissingMeta("name"),
            compensation_errors: vec![CompensationError {
                step: "launch_container".to_string(),
                description: "remove the container".to_string(),
                error: OperationError::External {
                    stage: "launch_container",
                    source: ExternalError::new("no such container"),
                },
            }],
            skipped: vec!["bridge_global_ip".to_string()],
        });

        let OperationError::SagaCompensationFailed {
            step,
            compensation_failures,
            skipped,
            ..
        } = err
        else {
            panic!("expected SagaCompensationFailed");
        };
        assert_eq!(step, "map_nat");
        assert_eq!(compensation_failures[0].step, "launch_container");
        assert_eq!(skipped, vec!["bridge_global_ip"]);
    }

    #[test]
    fn external_error_exposes_wrapped_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "docker: not found");
        let err = ExternalError::with_source("failed to run docker", io);

        assert_eq!(err.message(), "failed to run docker");
        assert_eq!(
            err.source().expect("has source").to_string(),
            "docker: not found"
        );
    }
}
