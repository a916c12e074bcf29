//! Integration tests for rollback passes where a compensation itself fails.

use std::cell::RefCell;

use provision_saga::{
    CompensationFailureMode, RollbackOrder, SagaBuilder, SagaError, SagaStep, StepStatus,
};

#[derive(Default)]
struct Host {
    undone: RefCell<Vec<&'static str>>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct HostError(String);

struct Resource {
    name: &'static str,
    stuck: bool,
}

fn resource(name: &'static str) -> Resource {
    Resource { name, stuck: false }
}

fn stuck(name: &'static str) -> Resource {
    Resource { name, stuck: true }
}

impl SagaStep for Resource {
    type Input = u32;
    type Output = u32;
    type Context = Host;
    type Error = HostError;

    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(&self, _ctx: &Host, count: u32) -> Result<u32, HostError> {
        Ok(count + 1)
    }

    fn compensate(&self, ctx: &Host, _count: u32) -> Result<(), HostError> {
        if self.stuck {
            return Err(HostError(format!("{} is busy", self.name)));
        }
        ctx.undone.borrow_mut().push(self.name);
        Ok(())
    }
}

struct Broken;

impl SagaStep for Broken {
    type Input = u32;
    type Output = u32;
    type Context = Host;
    type Error = HostError;

    fn name(&self) -> &'static str {
        "broken"
    }

    fn execute(&self, _ctx: &Host, _count: u32) -> Result<u32, HostError> {
        Err(HostError("step failed".to_string()))
    }
}

#[test]
fn continue_mode_reports_every_failed_compensation() {
    let host = Host::default();
    let saga = SagaBuilder::new()
        .first_step(stuck("local_ip"))
        .then(resource("global_ip"))
        .then(stuck("container"))
        .then(Broken)
        .build();

    let err = saga.execute(&host, 0).expect_err("saga should fail");

    let SagaError::CompensationFailed {
        failed_step,
        step_error,
        compensation_errors,
        skipped,
    } = err
    else {
        panic!("expected CompensationFailed");
    };
    assert_eq!(failed_step, "broken");
    assert_eq!(step_error.to_string(), "step failed");
    let failed: Vec<&str> = compensation_errors.iter().map(|e| e.step.as_str()).collect();
    assert_eq!(failed, vec!["container", "local_ip"]);
    assert!(skipped.is_empty());
    assert_eq!(*host.undone.borrow(), vec!["global_ip"]);
}

#[test]
fn halt_mode_leaves_later_resources_in_place() {
    let host = Host::default();
    let saga = SagaBuilder::new()
        .rollback_order(RollbackOrder::Forward)
        .on_compensation_failure(CompensationFailureMode::Halt)
        .first_step(resource("local_ip"))
        .then(stuck("global_ip"))
        .then(resource("container"))
        .then(Broken)
        .build();

    let (result, audit_log) = saga.execute_with_audit(&host, 0);

    let err = result.expect_err("saga should fail");
    assert_eq!(err.failed_step(), "broken");
    let SagaError::CompensationFailed {
        compensation_errors,
        skipped,
        ..
    } = err
    else {
        panic!("expected CompensationFailed");
    };
    assert_eq!(compensation_errors.len(), 1);
    assert_eq!(compensation_errors[0].step, "global_ip");
    assert_eq!(compensation_errors[0].error.to_string(), "global_ip is busy");
    assert_eq!(skipped, vec!["container"]);

    assert_eq!(*host.undone.borrow(), vec!["local_ip"]);
    assert_eq!(
        audit_log.compensation_sequence(),
        vec!["local_ip", "global_ip"]
    );
    assert_eq!(audit_log.unreleased(), vec!["global_ip", "container"]);
    assert_eq!(
        audit_log.records()[2].status,
        StepStatus::CompensationSkipped
    );
}

#[test]
fn compensation_error_message_names_the_step() {
    let host = Host::default();
    let saga = SagaBuilder::new()
        .first_step(stuck("container"))
        .then(Broken)
        .build();

    let err = saga.execute(&host, 0).expect_err("saga should fail");

    assert_eq!(
        err.to_string(),
        "step 'broken' failed, and 1 compensation(s) also failed"
    );
    if let SagaError::CompensationFailed {
        compensation_errors,
        ..
    } = err
    {
        assert_eq!(
            compensation_errors[0].to_string(),
            "compensation failed for step 'container': undo container"
        );
    }
}
