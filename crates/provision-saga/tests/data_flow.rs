//! Integration tests for data passed between steps.

use provision_saga::{SagaBuilder, SagaStep, StepStatus};

struct NoContext;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FlowError(String);

#[derive(Debug, Clone, PartialEq)]
struct Request {
    name: String,
    image: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Named {
    request: Request,
    container_name: String,
}

struct NameContainer {
    prefix: &'static str,
}

impl SagaStep for NameContainer {
    type Input = Request;
    type Output = Named;
    type Context = NoContext;
    type Error = FlowError;

    fn name(&self) -> &'static str {
        "name_container"
    }

    fn execute(&self, _ctx: &NoContext, request: Request) -> Result<Named, FlowError> {
        if request.name.is_empty() {
            return Err(FlowError("missing name".to_string()));
        }
        let container_name = format!("{}-{}", self.prefix, request.name);
        Ok(Named {
            request,
            container_name,
        })
    }
}

struct Describe;

impl SagaStep for Describe {
    type Input = Named;
    type Output = String;
    type Context = NoContext;
    type Error = FlowError;

    fn name(&self) -> &'static str {
        "describe"
    }

    fn execute(&self, _ctx: &NoContext, named: Named) -> Result<String, FlowError> {
        Ok(format!("{} runs {}", named.container_name, named.request.image))
    }
}

fn request(name: &str) -> Request {
    Request {
        name: name.to_string(),
        image: "postgres:16".to_string(),
    }
}

#[test]
fn outputs_flow_through_differently_typed_steps() -> anyhow::Result<()> {
    let saga = SagaBuilder::new()
        .first_step(NameContainer { prefix: "provision" })
        .then(Describe)
        .build();

    let description = saga.execute(&NoContext, request("data.db"))?;

    assert_eq!(description, "provision-data.db runs postgres:16");
    Ok(())
}

#[test]
fn saga_is_reusable_across_executions() -> anyhow::Result<()> {
    let saga = SagaBuilder::new()
        .first_step(NameContainer { prefix: "p" })
        .then(Describe)
        .build();

    assert_eq!(saga.execute(&NoContext, request("a"))?, "p-a runs postgres:16");
    assert_eq!(saga.execute(&NoContext, request("b"))?, "p-b runs postgres:16");
    Ok(())
}

#[test]
fn audit_log_marks_every_step_executed_on_success() {
    let saga = SagaBuilder::new()
        .first_step(NameContainer { prefix: "p" })
        .then(Describe)
        .build();

    let (result, audit_log) = saga.execute_with_audit(&NoContext, request("web"));

    assert!(result.is_ok());
    assert!(
        audit_log
            .records()
            .iter()
            .all(|r| r.status == StepStatus::Executed && r.completed_at.is_some())
    );
    assert!(audit_log.compensation_sequence().is_empty());
    assert_eq!(audit_log.summary(), "✓ name_container\n✓ describe");
}

#[test]
fn first_step_error_stops_the_saga() {
    let saga = SagaBuilder::new()
        .first_step(NameContainer { prefix: "p" })
        .then(Describe)
        .build();

    let (result, audit_log) = saga.execute_with_audit(&NoContext, request(""));

    let err = result.expect_err("empty name should fail");
    assert_eq!(err.failed_step(), "name_container");
    assert!(err.rolled_back_cleanly());
    assert_eq!(audit_log.records().len(), 1);
    assert_eq!(audit_log.records()[0].status, StepStatus::Failed);
}
