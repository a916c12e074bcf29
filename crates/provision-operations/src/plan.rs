//! Asking a freshly launched service what it needs.
//!
//! The service's plan hook receives `{"config": <boxfile config>}` on stdin
//! and answers with a JSON plan listing its users and the default user.

use provision_core::Plan;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::error::OperationError;
use crate::traits::ContainerEngine;

#[derive(Serialize)]
struct PlanRequest<'a> {
    config: &'a Value,
}

/// Encode the request sent to the plan hook.
///
/// # Errors
///
/// Returns `PlanPayload` if the config cannot be serialized.
pub fn request_payload(config: &Value) -> Result<String> {
    serde_json::to_string(&PlanRequest { config }).map_err(OperationError::PlanPayload)
}

/// Run the plan hook inside `container_id` and return its raw answer.
///
/// # Errors
///
/// Returns `External` tagged with `stage` if the hook cannot be run.
pub fn run<E: ContainerEngine + ?Sized>(
    engine: &E,
    container_id: &str,
    command: &[&str],
    config: &Value,
    stage: &'static str,
    output: &mut dyn FnMut(&str),
) -> Result<String> {
    let payload = request_payload(config)?;
    debug!(container = container_id, ?command, "running plan hook");
    engine
        .exec(container_id, command, &payload, output)
        .map_err(OperationError::external(stage))
}

/// Parse the plan hook's answer. Unknown fields are ignored; nothing beyond
/// the JSON shape is checked.
///
/// # Errors
///
/// Returns `PlanParse` tagged with `stage` if the answer is not a plan.
pub fn parse(raw: &str, stage: &'static str) -> Result<Plan> {
    serde_json::from_str(raw).map_err(|source| OperationError::PlanParse { stage, source })
}
