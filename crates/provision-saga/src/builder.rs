use std::fmt::Debug;
use std::marker::PhantomData;

use crate::erased::{ErasedStep, StepWrapper};
use crate::rollback::{CompensationFailureMode, RollbackOrder, RollbackPolicy};
use crate::saga::Saga;
use crate::step::SagaStep;

/// Marker type for a builder with no steps.
pub struct Empty;

/// Marker type for a builder with at least one step.
pub struct HasSteps<LastOutput>(PhantomData<LastOutput>);

/// Type-state builder for constructing type-safe sagas.
///
/// The builder enforces at compile-time that each step's input type matches
/// the previous step's output type, and that a saga has at least one step.
///
/// ```compile_fail
/// use provision_saga::{SagaBuilder, SagaStep};
///
/// struct Reserve;
/// impl SagaStep for Reserve {
///     type Input = ();
///     type Output = std::net::Ipv4Addr;
///     type Context = ();
///     type Error = ();
///     fn name(&self) -> &'static str { "reserve" }
///     fn execute(&self, _: &(), _: ()) -> Result<std::net::Ipv4Addr, ()> {
///         Ok(std::net::Ipv4Addr::LOCALHOST)
///     }
/// }
///
/// struct Launch;
/// impl SagaStep for Launch {
///     type Input = String;  // expects a container name, not an address
///     type Output = String;
///     type Context = ();
///     type Error = ();
///     fn name(&self) -> &'static str { "launch" }
///     fn execute(&self, _: &(), input: String) -> Result<String, ()> {
///         Ok(input)
///     }
/// }
///
/// let saga = SagaBuilder::new()
///     .first_step(Reserve)
///     .then(Launch)  // Compile error here!
///     .build();
/// ```
///
/// An empty saga cannot be built:
///
/// ```compile_fail
/// use provision_saga::SagaBuilder;
///
/// let saga = SagaBuilder::<(), (), (), (), _>::new().build();
/// ```
pub struct SagaBuilder<Input, Output, Ctx, Err, State> {
    steps: Vec<Box<dyn ErasedStep<Ctx, Err>>>,
    policy: RollbackPolicy,
    _phantom: PhantomData<(Input, Output, State)>,
}

impl<Ctx, Err> SagaBuilder<(), (), Ctx, Err, Empty> {
    /// Create a new saga builder in the empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            policy: RollbackPolicy::default(),
            _phantom: PhantomData,
        }
    }

    /// Add the first step to the saga.
    ///
    /// This establishes the saga's input type from the step's input type.
    #[must_use]
    pub fn first_step<S>(
        self,
        step: S,
    ) -> SagaBuilder<S::Input, S::Output, Ctx, Err, HasSteps<S::Output>>
    where
        S: SagaStep<Context = Ctx, Error = Err> + 'static,
    {
        self.push(step)
    }
}

impl<Ctx, Err> Default for SagaBuilder<(), (), Ctx, Err, Empty> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Input, Output, Ctx, Err, State> SagaBuilder<Input, Output, Ctx, Err, State> {
    /// Set the order in which completed steps are compensated.
    #[must_use]
    pub fn rollback_order(mut self, order: RollbackOrder) -> Self {
        self.policy.order = order;
        self
    }

    /// Set what rollback does when a compensation fails.
    #[must_use]
    pub fn on_compensation_failure(mut self, mode: CompensationFailureMode) -> Self {
        self.policy.on_failure = mode;
        self
    }

    fn push<S, NextInput>(
        self,
        step: S,
    ) -> SagaBuilder<NextInput, S::Output, Ctx, Err, HasSteps<S::Output>>
    where
        S: SagaStep<Context = Ctx, Error = Err> + 'static,
    {
        let mut steps = self.steps;
        steps.push(Box::new(StepWrapper::new(step)));
        SagaBuilder {
            steps,
            policy: self.policy,
            _phantom: PhantomData,
        }
    }
}

impl<Input, CurrentOutput, Ctx, Err>
    SagaBuilder<Input, CurrentOutput, Ctx, Err, HasSteps<CurrentOutput>>
{
    /// Add another step to the saga.
    ///
    /// The step's input type must match the current output type.
    #[must_use]
    pub fn then<S>(self, step: S) -> SagaBuilder<Input, S::Output, Ctx, Err, HasSteps<S::Output>>
    where
        S: SagaStep<Input = CurrentOutput, Context = Ctx, Error = Err> + 'static,
    {
        self.push(step)
    }

    /// Build the saga from the accumulated steps.
    #[must_use]
    pub fn build(self) -> Saga<Input, CurrentOutput, Ctx, Err>
    where
        Input: Clone + Send + 'static,
        CurrentOutput: Send + 'static,
        Err: Debug,
    {
        Saga::from_steps(self.steps, self.policy)
    }
}
