use std::net::Ipv4Addr;

use provision_core::{EnvVars, Service};
use serde_json::Value;

use crate::Result;
use crate::error::OperationError;

/// Everything the service setup saga has learned or acquired so far.
///
/// Each step hands an updated copy to the next one; the copy a step returned
/// is what its compensation receives.
#[derive(Debug, Clone)]
pub struct ProvisionData {
    pub name: String,
    pub image: String,
    /// `config` subtree of the boxfile for this service.
    pub config: Value,
    /// Record as it was loaded before the saga started.
    pub previous: Option<Service>,

    pub local_ip: Option<Ipv4Addr>,
    pub global_ip: Option<Ipv4Addr>,
    pub container_id: Option<String>,
    pub plan_output: Option<String>,
    pub service: Option<Service>,
    pub env: Option<EnvVars>,
}

impl ProvisionData {
    #[must_use]
    pub fn new(name: &str, image: &str, config: Value, previous: Option<Service>) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            config,
            previous,
            local_ip: None,
            global_ip: None,
            container_id: None,
            plan_output: None,
            service: None,
            env: None,
        }
    }

    pub(super) fn local_ip(&self, step: &'static str) -> Result<Ipv4Addr> {
        self.local_ip.ok_or(OperationError::IncompleteSagaData {
            step,
            field: "local_ip",
        })
    }

    pub(super) fn global_ip(&self, step: &'static str) -> Result<Ipv4Addr> {
        self.global_ip.ok_or(OperationError::IncompleteSagaData {
            step,
            field: "global_ip",
        })
    }

    pub(super) fn container_id(&self, step: &'static str) -> Result<&str> {
        self.container_id
            .as_deref()
            .ok_or(OperationError::IncompleteSagaData {
                step,
                field: "container_id",
            })
    }

    pub(super) fn service(&self, step: &'static str) -> Result<&Service> {
        self.service
            .as_ref()
            .ok_or(OperationError::IncompleteSagaData {
                step,
                field: "service",
            })
    }
}
