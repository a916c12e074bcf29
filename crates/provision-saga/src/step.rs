/// A step in a saga that can be executed and compensated.
///
/// A step turns its input into an output. If a later step fails, the step is
/// compensated with the output it produced, which records everything the step
/// acquired (an address, a container, a persisted record).
///
/// # Type Parameters
///
/// - `Input`: Data received from the previous step (or saga entry point)
/// - `Output`: Data produced for the next step, kept for compensation
/// - `Context`: Shared dependencies (injected, not passed between steps)
/// - `Error`: The error type for step failures
pub trait SagaStep: Send + Sync {
    /// Data received from the previous step or saga entry point.
    type Input: Clone + Send + 'static;

    /// Data produced for the next step.
    type Output: Clone + Send + 'static;

    /// Shared context providing dependencies.
    type Context;

    /// Error type for step failures.
    type Error;

    /// Human-readable name for logging and error messages.
    fn name(&self) -> &'static str;

    /// Execute the step, transforming input into output.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails to complete. A failed step is not
    /// compensated, so it must not leave anything acquired behind.
    fn execute(&self, ctx: &Self::Context, input: Self::Input)
    -> Result<Self::Output, Self::Error>;

    /// Compensate (undo) the step's effects.
    ///
    /// Called during rollback when a later step fails, with the output this
    /// step's `execute()` returned.
    ///
    /// The default implementation is a no-op, suitable for steps that acquire
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails.
    fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
        let _ = (ctx, output);
        Ok(())
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}
