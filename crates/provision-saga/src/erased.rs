use std::any::Any;

use crate::step::SagaStep;

/// A value flowing between steps with its concrete type erased.
///
/// Step outputs are cloned before being handed on, so the copy kept for
/// compensation is independent of what later steps do with theirs.
pub(crate) trait Payload: Any + Send {
    fn clone_payload(&self) -> Box<dyn Payload>;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T> Payload for T
where
    T: Clone + Send + 'static,
{
    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

pub(crate) fn downcast<T: 'static>(payload: Box<dyn Payload>) -> T {
    *payload
        .into_any()
        .downcast::<T>()
        .expect("type-state builder guarantees payload types line up")
}

pub(crate) trait ErasedStep<Ctx, Err> {
    fn name(&self) -> &'static str;

    fn execute_erased(&self, ctx: &Ctx, input: Box<dyn Payload>)
    -> Result<Box<dyn Payload>, Err>;

    fn compensate_erased(&self, ctx: &Ctx, output: Box<dyn Payload>) -> Result<(), Err>;

    fn compensation_description(&self) -> String;
}

pub(crate) struct StepWrapper<S> {
    step: S,
}

impl<S> StepWrapper<S> {
    pub(crate) fn new(step: S) -> Self {
        Self { step }
    }
}

impl<S> ErasedStep<S::Context, S::Error> for StepWrapper<S>
where
    S: SagaStep,
{
    fn name(&self) -> &'static str {
        self.step.name()
    }

    fn execute_erased(
        &self,
        ctx: &S::Context,
        input: Box<dyn Payload>,
    ) -> Result<Box<dyn Payload>, S::Error> {
        let output = self.step.execute(ctx, downcast::<S::Input>(input))?;
        Ok(Box::new(output))
    }

    fn compensate_erased(&self, ctx: &S::Context, output: Box<dyn Payload>) -> Result<(), S::Error> {
        self.step.compensate(ctx, downcast::<S::Output>(output))
    }

    fn compensation_description(&self) -> String {
        self.step.compensation_description()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct Ledger {
        released: RefCell<Vec<u16>>,
    }

    #[derive(Debug, PartialEq)]
    struct LedgerError(&'static str);

    /// Hands out the next port after the input.
    struct AllocatePort;

    impl SagaStep for AllocatePort {
        type Input = u16;
        type Output = u16;
        type Context = Ledger;
        type Error = LedgerError;

        fn name(&self) -> &'static str {
            "allocate_port"
        }

        fn execute(
            &self,
            _ctx: &Self::Context,
            input: Self::Input,
        ) -> Result<Self::Output, Self::Error> {
            input.checked_add(1).ok_or(LedgerError("port space exhausted"))
        }

        fn compensate(&self, ctx: &Self::Context, output: Self::Output) -> Result<(), Self::Error> {
            ctx.released.borrow_mut().push(output);
            Ok(())
        }
    }

    fn ledger() -> Ledger {
        Ledger {
            released: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn cloned_payload_is_independent() {
        let original: Box<dyn Payload> = Box::new(vec![1_u8, 2]);
        let copy = original.clone_payload();

        let mut original = downcast::<Vec<u8>>(original);
        original.push(3);

        assert_eq!(downcast::<Vec<u8>>(copy), vec![1, 2]);
    }

    #[test]
    fn payload_rejects_wrong_type_on_plain_downcast() {
        let payload: Box<dyn Payload> = Box::new(5_u32);

        assert!(payload.into_any().downcast::<String>().is_err());
    }

    #[test]
    fn wrapper_executes_with_erased_types() {
        let wrapper = StepWrapper::new(AllocatePort);

        let output = wrapper
            .execute_erased(&ledger(), Box::new(8080_u16))
            .expect("execution should succeed");

        assert_eq!(downcast::<u16>(output), 8081);
    }

    #[test]
    fn wrapper_compensates_with_step_output() {
        let ctx = ledger();
        let wrapper = StepWrapper::new(AllocatePort);

        wrapper
            .compensate_erased(&ctx, Box::new(8081_u16))
            .expect("compensation should succeed");

        assert_eq!(*ctx.released.borrow(), vec![8081]);
    }

    #[test]
    fn wrapper_propagates_step_errors() {
        let wrapper = StepWrapper::new(AllocatePort);

        let err = wrapper
            .execute_erased(&ledger(), Box::new(u16::MAX))
            .err()
            .expect("should fail");

        assert_eq!(err, LedgerError("port space exhausted"));
    }

    #[test]
    fn wrapper_delegates_name_and_description() {
        let wrapper = StepWrapper::new(AllocatePort);

        assert_eq!(wrapper.name(), "allocate_port");
        assert_eq!(wrapper.compensation_description(), "undo allocate_port");
    }
}
