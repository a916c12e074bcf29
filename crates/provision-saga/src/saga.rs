use std::fmt::Debug;
use std::marker::PhantomData;

use crate::audit::SagaAuditLog;
use crate::erased::{ErasedStep, Payload, downcast};
use crate::error::{CompensationError, SagaError};
use crate::rollback::{CompensationFailureMode, RollbackPolicy};

/// A compiled saga ready for execution.
///
/// Sagas execute a sequence of steps, where each step's output becomes the
/// next step's input. If any step fails, the steps that completed are
/// compensated as the saga's [`RollbackPolicy`] dictates.
pub struct Saga<Input, Output, Ctx, Err> {
    steps: Vec<Box<dyn ErasedStep<Ctx, Err>>>,
    policy: RollbackPolicy,
    _phantom: PhantomData<(Input, Output)>,
}

impl<Input, Output, Ctx, Err> Saga<Input, Output, Ctx, Err>
where
    Input: Clone + Send + 'static,
    Output: Send + 'static,
    Err: Debug,
{
    pub(crate) fn from_steps(
        steps: Vec<Box<dyn ErasedStep<Ctx, Err>>>,
        policy: RollbackPolicy,
    ) -> Self {
        Self {
            steps,
            policy,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn policy(&self) -> RollbackPolicy {
        self.policy
    }

    /// Names of the steps in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Execute the saga, returning the final output on success.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::StepFailed` if a step fails and all compensations succeed.
    /// Returns `SagaError::CompensationFailed` if a step fails and rollback does not complete.
    pub fn execute(&self, ctx: &Ctx, input: Input) -> Result<Output, SagaError<Err>> {
        let (result, _audit_log) = self.execute_internal(ctx, input);
        result
    }

    /// Execute the saga and return both the result and an audit log.
    ///
    /// The audit log tracks all step executions and compensations.
    pub fn execute_with_audit(
        &self,
        ctx: &Ctx,
        input: Input,
    ) -> (Result<Output, SagaError<Err>>, SagaAuditLog) {
        self.execute_internal(ctx, input)
    }

    fn execute_internal(
        &self,
        ctx: &Ctx,
        input: Input,
    ) -> (Result<Output, SagaError<Err>>, SagaAuditLog) {
        let mut audit_log = SagaAuditLog::new();
        let mut completed: Vec<(usize, Box<dyn Payload>)> = Vec::new();

        let mut current: Box<dyn Payload> = Box::new(input);

        for (index, step) in self.steps.iter().enumerate() {
            audit_log.record_start(step.name());

            match step.execute_erased(ctx, current) {
                Ok(output) => {
                    audit_log.record_success(step.compensation_description());
                    completed.push((index, output.clone_payload()));
                    current = output;
                }
                Err(error) => {
                    audit_log.record_failure();
                    let saga_error =
                        self.compensate(ctx, &mut audit_log, completed, step.name(), error);
                    return (Err(saga_error), audit_log);
                }
            }
        }

        (Ok(downcast::<Output>(current)), audit_log)
    }

    fn compensate(
        &self,
        ctx: &Ctx,
        audit_log: &mut SagaAuditLog,
        completed: Vec<(usize, Box<dyn Payload>)>,
        failed_step: &str,
        step_error: Err,
    ) -> SagaError<Err> {
        let mut compensation_errors = Vec::new();
        let mut skipped = Vec::new();

        let mut pending = self.policy.arrange(completed).into_iter();
        while let Some((index, output)) = pending.next() {
            let step = &self.steps[index];
            let step_name = step.name();

            match step.compensate_erased(ctx, output) {
                Ok(()) => audit_log.record_compensated(step_name),
                Err(error) => {
                    audit_log.record_compensation_failed(step_name);
                    compensation_errors.push(CompensationError {
                        step: step_name.to_string(),
                        description: step.compensation_description(),
                        error,
                    });

                    if self.policy.on_failure == CompensationFailureMode::Halt {
                        for (index, _) in pending.by_ref() {
                            let name = self.steps[index].name();
                            audit_log.record_compensation_skipped(name);
                            skipped.push(name.to_string());
                        }
                    }
                }
            }
        }

        if compensation_errors.is_empty() {
            SagaError::StepFailed {
                step: failed_step.to_string(),
                source: step_error,
            }
        } else {
            SagaError::CompensationFailed {
                failed_step: failed_step.to_string(),
                step_error,
                compensation_errors,
                skipped,
            }
        }
    }
}
